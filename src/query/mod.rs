//! Dynamic item query assembly
//!
//! The item listing is served by one fixed SELECT/JOIN template
//! ([`BASE_ITEM_QUERY`]) to which filters are appended as a single WHERE
//! clause of ANDed predicates. Every filterable field lives in the
//! [`FilterField`] allowlist, so arbitrary column names can never reach the
//! query text, and every value is emitted as a `$n` placeholder to be bound
//! at execution time.
//!
//! An empty filter set builds to the base template byte-for-byte.

use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::FilterError;

/// Base projection and joins for the item listing.
///
/// Columns, in order: asset tag, status, quality, size, resource-type name,
/// warehouse id, warehouse address. The resource type is an inner join (an
/// item without a matching type row is excluded); the warehouse is a left
/// join (the last two columns are null for unassigned items).
pub const BASE_ITEM_QUERY: &str =
    "SELECT i.NROPATRIMONIO, i.STATUSITEM, i.QUALIDADE, i.TAMANHO, trf.NOME, a.IDARMAZEM, a.ENDERECO \
     FROM ITEM i \
     JOIN TIPORECURSOFISICO trf ON i.IDTIPORECURSO = trf.IDTIPORECURSO \
     LEFT JOIN ARMAZEM a ON i.IDARMAZEM = a.IDARMAZEM";

/// The permitted filter fields.
///
/// This is the whole allowlist: anything a caller names that does not resolve
/// to one of these variants is rejected before any query text exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    AssetTag,
    Status,
    Quality,
    Size,
    ResourceTypeName,
    WarehouseId,
}

impl FilterField {
    pub const ALL: [FilterField; 6] = [
        FilterField::AssetTag,
        FilterField::Status,
        FilterField::Quality,
        FilterField::Size,
        FilterField::ResourceTypeName,
        FilterField::WarehouseId,
    ];

    /// Column reference this field predicates on in the base query.
    pub fn column(self) -> &'static str {
        match self {
            FilterField::AssetTag => "i.NROPATRIMONIO",
            FilterField::Status => "i.STATUSITEM",
            FilterField::Quality => "i.QUALIDADE",
            FilterField::Size => "i.TAMANHO",
            FilterField::ResourceTypeName => "trf.NOME",
            FilterField::WarehouseId => "a.IDARMAZEM",
        }
    }

    /// Canonical external name, as accepted by [`FilterField::from_str`].
    pub fn name(self) -> &'static str {
        match self {
            FilterField::AssetTag => "asset_tag",
            FilterField::Status => "status",
            FilterField::Quality => "quality",
            FilterField::Size => "size",
            FilterField::ResourceTypeName => "resource_type",
            FilterField::WarehouseId => "warehouse",
        }
    }

    fn is_numeric(self) -> bool {
        matches!(self, FilterField::Size)
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterField {
    type Err = FilterError;

    /// Resolves an external field name. Legacy parameter names of the
    /// listing endpoint (`nropatrimonio`, `statusitem`, `qualidade`,
    /// `tamanho`, `armazem`) are accepted as aliases; their values mean the
    /// same thing they always did. `tiporecursofisico` is deliberately not
    /// one: its legacy value was a type id, which would silently match
    /// nothing against the type name this field compares.
    fn from_str(s: &str) -> Result<Self, FilterError> {
        match s.to_ascii_lowercase().as_str() {
            "asset_tag" | "nropatrimonio" => Ok(FilterField::AssetTag),
            "status" | "statusitem" => Ok(FilterField::Status),
            "quality" | "qualidade" => Ok(FilterField::Quality),
            "size" | "tamanho" => Ok(FilterField::Size),
            "resource_type" => Ok(FilterField::ResourceTypeName),
            "warehouse" | "armazem" => Ok(FilterField::WarehouseId),
            _ => Err(FilterError::UnknownField(s.to_string())),
        }
    }
}

/// Comparison operators supported by the builder.
///
/// Filters always combine with AND; `ILike` exists for the asset-tag search
/// box and is a case-insensitive substring match when the value is
/// `%`-wrapped (see [`Filter::contains`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    ILike,
}

impl FilterOp {
    pub fn sql(self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::ILike => "ILIKE",
        }
    }
}

impl FromStr for FilterOp {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, FilterError> {
        match s.to_ascii_lowercase().as_str() {
            "=" | "eq" => Ok(FilterOp::Eq),
            "ilike" => Ok(FilterOp::ILike),
            _ => Err(FilterError::UnknownOperator(s.to_string())),
        }
    }
}

/// A value bound to one placeholder.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Text(String),
    Number(f64),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<f64> for FilterValue {
    fn from(n: f64) -> Self {
        FilterValue::Number(n)
    }
}

/// One (field, operator, value) predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: FilterField,
    pub op: FilterOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: FilterField, op: FilterOp, value: impl Into<FilterValue>) -> Self {
        Self {
            field,
            op,
            value: value.into(),
        }
    }

    /// Equality predicate.
    pub fn equals(field: FilterField, value: impl Into<FilterValue>) -> Self {
        Self::new(field, FilterOp::Eq, value)
    }

    /// Case-insensitive substring match. Wraps the value in `%` the way the
    /// listing endpoint treats its `search` parameter.
    pub fn contains(field: FilterField, value: &str) -> Self {
        Self::new(field, FilterOp::ILike, format!("%{value}%"))
    }

    /// Builds a filter from untrusted string parts, validating the field
    /// name against the allowlist and typing the value by field.
    pub fn parse(field: &str, op: &str, value: &str) -> Result<Self, FilterError> {
        let field: FilterField = field.parse()?;
        let op: FilterOp = op.parse()?;
        let value = if field.is_numeric() {
            let n: f64 = value.parse().map_err(|_| FilterError::InvalidNumber {
                field: field.name(),
                value: value.to_string(),
            })?;
            FilterValue::Number(n)
        } else {
            FilterValue::Text(value.to_string())
        };
        Ok(Self { field, op, value })
    }
}

/// An executable query: SQL text with `$n` placeholders plus the parameter
/// values to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub sql: String,
    pub params: Vec<FilterValue>,
}

/// Ordered filter set over the item listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemQuery {
    filters: Vec<Filter>,
}

impl ItemQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_filters(filters: Vec<Filter>) -> Self {
        Self { filters }
    }

    /// Appends a filter, builder style.
    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn push(&mut self, filter: Filter) {
        self.filters.push(filter);
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Assembles the final query.
    ///
    /// With no filters the SQL is the base template unchanged. Otherwise one
    /// ` WHERE ` is appended with the predicates joined by ` AND `, in filter
    /// order, each referencing the next `$n` placeholder.
    pub fn build(&self) -> BuiltQuery {
        if self.filters.is_empty() {
            return BuiltQuery {
                sql: BASE_ITEM_QUERY.to_string(),
                params: Vec::new(),
            };
        }

        let mut sql = String::with_capacity(BASE_ITEM_QUERY.len() + 32 * self.filters.len());
        sql.push_str(BASE_ITEM_QUERY);
        sql.push_str(" WHERE ");

        let mut params = Vec::with_capacity(self.filters.len());
        for (i, filter) in self.filters.iter().enumerate() {
            if i > 0 {
                sql.push_str(" AND ");
            }
            // write! to a String cannot fail
            let _ = write!(
                sql,
                "{} {} ${}",
                filter.field.column(),
                filter.op.sql(),
                i + 1
            );
            params.push(filter.value.clone());
        }

        BuiltQuery { sql, params }
    }
}

impl FromIterator<Filter> for ItemQuery {
    fn from_iter<I: IntoIterator<Item = Filter>>(iter: I) -> Self {
        Self {
            filters: iter.into_iter().collect(),
        }
    }
}

/// Optional listing parameters as the item endpoint receives them.
///
/// `None`, empty strings and the literal `"all"` sentinel mean "do not filter
/// on this field". `search` becomes a `%`-wrapped ILIKE on the asset tag; the
/// remaining fields become equality predicates. The legacy Portuguese
/// parameter names are accepted as deserialization aliases, except
/// `tiporecursofisico`: that parameter carried a type id, and aliasing it
/// onto the name-based `resource_type` field would silently return nothing.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ItemFilterParams {
    pub search: Option<String>,
    /// Resource-type *name* to match exactly.
    pub resource_type: Option<String>,
    #[serde(alias = "statusitem")]
    pub status: Option<String>,
    #[serde(alias = "qualidade")]
    pub quality: Option<String>,
    #[serde(alias = "tamanho")]
    pub size: Option<f64>,
    #[serde(alias = "armazem")]
    pub warehouse: Option<String>,
}

impl ItemFilterParams {
    pub fn into_query(self) -> ItemQuery {
        let mut query = ItemQuery::new();
        if let Some(resource_type) = selected(self.resource_type) {
            query.push(Filter::equals(FilterField::ResourceTypeName, resource_type));
        }
        if let Some(status) = selected(self.status) {
            query.push(Filter::equals(FilterField::Status, status));
        }
        if let Some(quality) = selected(self.quality) {
            query.push(Filter::equals(FilterField::Quality, quality));
        }
        if let Some(size) = self.size {
            query.push(Filter::equals(FilterField::Size, size));
        }
        if let Some(warehouse) = selected(self.warehouse) {
            query.push(Filter::equals(FilterField::WarehouseId, warehouse));
        }
        if let Some(search) = self.search.filter(|s| !s.is_empty()) {
            query.push(Filter::contains(FilterField::AssetTag, &search));
        }
        query
    }
}

/// Dropdown filters send `"all"` (or nothing) when no option is selected.
fn selected(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty() && v != "all")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_filter_set_builds_base_query_unchanged() {
        let built = ItemQuery::new().build();
        assert_eq!(built.sql, BASE_ITEM_QUERY);
        assert!(built.params.is_empty());
    }

    #[test]
    fn single_status_filter_appends_one_predicate() {
        let built = ItemQuery::new()
            .filter(Filter::equals(FilterField::Status, "ATIVO"))
            .build();
        assert_eq!(
            built.sql,
            format!("{BASE_ITEM_QUERY} WHERE i.STATUSITEM = $1")
        );
        assert_eq!(built.params, vec![FilterValue::Text("ATIVO".to_string())]);
    }

    #[test]
    fn multiple_filters_join_with_and_in_order() {
        let built = ItemQuery::new()
            .filter(Filter::equals(FilterField::ResourceTypeName, "Mesa"))
            .filter(Filter::equals(FilterField::Status, "Disponível"))
            .filter(Filter::equals(FilterField::WarehouseId, "ARM-01"))
            .build();
        assert_eq!(
            built.sql,
            format!(
                "{BASE_ITEM_QUERY} WHERE trf.NOME = $1 \
                 AND i.STATUSITEM = $2 AND a.IDARMAZEM = $3"
            )
        );
        assert_eq!(built.params.len(), 3);
        assert_eq!(built.params[2], FilterValue::Text("ARM-01".to_string()));
    }

    #[test]
    fn contains_wraps_value_in_percent() {
        let built = ItemQuery::new()
            .filter(Filter::contains(FilterField::AssetTag, "PAT-2024"))
            .build();
        assert!(built.sql.ends_with("WHERE i.NROPATRIMONIO ILIKE $1"));
        assert_eq!(
            built.params,
            vec![FilterValue::Text("%PAT-2024%".to_string())]
        );
    }

    #[test]
    fn size_filter_binds_a_number() {
        let built = ItemQuery::new()
            .filter(Filter::equals(FilterField::Size, 2.5))
            .build();
        assert!(built.sql.ends_with("WHERE i.TAMANHO = $1"));
        assert_eq!(built.params, vec![FilterValue::Number(2.5)]);
    }

    #[test]
    fn user_values_never_appear_in_query_text() {
        let hostile = "'; DROP TABLE ITEM; --";
        let built = ItemQuery::new()
            .filter(Filter::equals(FilterField::Status, hostile))
            .build();
        assert!(!built.sql.contains(hostile));
        assert_eq!(built.params, vec![FilterValue::Text(hostile.to_string())]);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = Filter::parse("color", "=", "red").unwrap_err();
        assert_eq!(err, FilterError::UnknownField("color".to_string()));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = Filter::parse("status", ">", "ATIVO").unwrap_err();
        assert_eq!(err, FilterError::UnknownOperator(">".to_string()));
    }

    #[test]
    fn size_value_must_be_numeric() {
        let err = Filter::parse("size", "=", "big").unwrap_err();
        assert_eq!(
            err,
            FilterError::InvalidNumber {
                field: "size",
                value: "big".to_string()
            }
        );
        let filter = Filter::parse("size", "=", "2.5").unwrap();
        assert_eq!(filter.value, FilterValue::Number(2.5));
    }

    #[test]
    fn legacy_field_names_resolve_as_aliases() {
        assert_eq!(
            "nropatrimonio".parse::<FilterField>().unwrap(),
            FilterField::AssetTag
        );
        assert_eq!(
            "statusitem".parse::<FilterField>().unwrap(),
            FilterField::Status
        );
        assert_eq!("armazem".parse::<FilterField>().unwrap(), FilterField::WarehouseId);
    }

    #[test]
    fn legacy_resource_type_id_name_is_not_an_alias() {
        // The legacy `tiporecursofisico` parameter carried a type *id*;
        // resolving it onto the name-based field would match nothing, so it
        // must be rejected rather than silently change meaning.
        let err = "tiporecursofisico".parse::<FilterField>().unwrap_err();
        assert_eq!(
            err,
            FilterError::UnknownField("tiporecursofisico".to_string())
        );

        // On the params struct the unknown key is ignored entirely: no
        // filter is produced, instead of an id-vs-name equality that can
        // never hold.
        let params: ItemFilterParams =
            serde_json::from_str(r#"{"tiporecursofisico": "TR001"}"#).unwrap();
        assert_eq!(params.resource_type, None);
        assert!(params.into_query().is_empty());
    }

    #[test]
    fn every_permitted_field_round_trips_through_its_name() {
        for field in FilterField::ALL {
            assert_eq!(field.name().parse::<FilterField>().unwrap(), field);
        }
    }

    #[test]
    fn params_skip_all_sentinel_and_empty_values() {
        let params = ItemFilterParams {
            resource_type: Some("all".to_string()),
            status: Some("Disponível".to_string()),
            quality: Some(String::new()),
            ..Default::default()
        };
        let query = params.into_query();
        assert_eq!(query.filters().len(), 1);
        assert_eq!(query.filters()[0].field, FilterField::Status);
    }

    #[test]
    fn params_search_becomes_asset_tag_ilike() {
        let params = ItemFilterParams {
            search: Some("123".to_string()),
            ..Default::default()
        };
        let built = params.into_query().build();
        assert!(built.sql.ends_with("WHERE i.NROPATRIMONIO ILIKE $1"));
        assert_eq!(built.params, vec![FilterValue::Text("%123%".to_string())]);
    }

    #[test]
    fn params_accept_legacy_wire_names() {
        let params: ItemFilterParams = serde_json::from_str(
            r#"{"statusitem": "ATIVO", "qualidade": "Boa", "armazem": "ARM-01"}"#,
        )
        .unwrap();
        assert_eq!(params.status.as_deref(), Some("ATIVO"));
        assert_eq!(params.quality.as_deref(), Some("Boa"));
        assert_eq!(params.warehouse.as_deref(), Some("ARM-01"));
    }

    fn one_filter_per_field() -> Vec<Filter> {
        vec![
            Filter::contains(FilterField::AssetTag, "PAT"),
            Filter::equals(FilterField::Status, "Disponível"),
            Filter::equals(FilterField::Quality, "Boa"),
            Filter::equals(FilterField::Size, 1.5),
            Filter::equals(FilterField::ResourceTypeName, "Mesa"),
            Filter::equals(FilterField::WarehouseId, "ARM-01"),
        ]
    }

    proptest! {
        // Structural contract: exactly one WHERE, one predicate per filter,
        // ANDed, one bound parameter per filter.
        #[test]
        fn where_clause_structure(
            filters in proptest::sample::subsequence(one_filter_per_field(), 0..=6)
        ) {
            let n = filters.len();
            let built = ItemQuery::from_filters(filters).build();

            prop_assert!(built.sql.starts_with(BASE_ITEM_QUERY));
            prop_assert_eq!(built.sql.matches(" WHERE ").count(), usize::from(n > 0));
            if n > 0 {
                prop_assert_eq!(built.sql.matches(" AND ").count(), n - 1);
            }
            prop_assert_eq!(built.params.len(), n);
            for i in 1..=n {
                let placeholder = format!("${i}");
                prop_assert!(built.sql.contains(&placeholder));
            }
        }
    }
}
