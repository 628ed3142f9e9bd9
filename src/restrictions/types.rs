//! Restriction records and their persisted wire shape

use serde::{Deserialize, Deserializer, Serialize};

use crate::geometry::Rect;

/// What a restriction masks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestrictionKind {
    /// A named form field, authored against the template image
    FieldMask,
    /// A free-form area drawn on a rendered page
    AreaMask,
}

impl RestrictionKind {
    /// Normalize the persisted `restrictedType` value
    pub fn from_persisted(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return RestrictionKind::FieldMask;
        };
        match value.trim().to_ascii_lowercase().as_str() {
            "open" | "area" | "custom area" | "custom_area" | "areamask" => {
                RestrictionKind::AreaMask
            }
            _ => RestrictionKind::FieldMask,
        }
    }

    pub fn as_persisted(&self) -> &'static str {
        match self {
            RestrictionKind::FieldMask => "field",
            RestrictionKind::AreaMask => "open",
        }
    }
}

/// A stored restriction
///
/// `rect` is in template space for field masks and in render-scale page
/// pixels for area masks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Restriction {
    pub id: Option<String>,
    pub document_id: String,
    pub kind: RestrictionKind,
    pub field: Option<String>,
    pub rect: Rect,
    pub page_number: u32,
    pub subject_role: Option<String>,
    pub subject_user: Option<String>,
    pub reason: String,
    pub created_by: Option<String>,
    pub created_date: Option<String>,
}

impl Restriction {
    /// Whether this restriction masks content for `viewer`
    pub fn applies_to(&self, viewer: &Viewer) -> bool {
        let user = non_blank(self.subject_user.as_deref());
        let role = non_blank(self.subject_role.as_deref());

        if user.is_none() && role.is_none() {
            return true;
        }

        let user_matches = match (user, non_blank(viewer.user_id.as_deref())) {
            (Some(subject), Some(viewer)) => subject == viewer,
            _ => false,
        };
        let role_matches = match (role, non_blank(viewer.role.as_deref())) {
            (Some(subject), Some(viewer)) => subject.eq_ignore_ascii_case(viewer),
            _ => false,
        };
        user_matches || role_matches
    }

    /// Stable label for logs
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<unsaved>")
    }
}

/// Identity of the person looking at a document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// Payload for creating a restriction
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRestriction {
    pub kind: RestrictionKind,
    #[serde(default)]
    pub field: Option<String>,
    pub rect: Rect,
    #[serde(default = "default_page_number")]
    pub page_number: u32,
    #[serde(default)]
    pub subject_role: Option<String>,
    #[serde(default)]
    pub subject_user: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub created_by: Option<String>,
}

fn default_page_number() -> u32 {
    1
}

/// Keep restrictions that apply to `viewer` on `page_number`
pub fn restrictions_for_view(
    restrictions: &[Restriction],
    viewer: &Viewer,
    page_number: u32,
) -> Vec<Restriction> {
    restrictions
        .iter()
        .filter(|r| r.page_number == page_number && r.applies_to(viewer))
        .cloned()
        .collect()
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Restriction as exchanged with the backing service
///
/// Field names follow the service's mixed casing; camelCase and snake_case
/// aliases are accepted on input, and numeric fields may be strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedRestriction {
    #[serde(
        rename = "ID",
        alias = "id",
        alias = "Id",
        default,
        deserialize_with = "flexible_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(
        rename = "DocumentID",
        alias = "documentId",
        alias = "document_id",
        default,
        deserialize_with = "flexible_string"
    )]
    pub document_id: Option<String>,
    #[serde(rename = "Field", alias = "field", default)]
    pub field: Option<String>,
    #[serde(rename = "Reason", alias = "reason", default)]
    pub reason: Option<String>,
    #[serde(
        rename = "UserID",
        alias = "userId",
        alias = "user_id",
        default,
        deserialize_with = "flexible_string"
    )]
    pub user_id: Option<String>,
    #[serde(rename = "UserRole", alias = "userRole", alias = "user_role", default)]
    pub user_role: Option<String>,
    #[serde(
        rename = "restrictedType",
        alias = "RestrictedType",
        alias = "restricted_type",
        default
    )]
    pub restricted_type: Option<String>,
    #[serde(
        rename = "xaxis",
        alias = "xAxis",
        alias = "x_axis",
        alias = "x",
        default,
        deserialize_with = "flexible_f64"
    )]
    pub xaxis: Option<f64>,
    #[serde(
        rename = "yaxis",
        alias = "yAxis",
        alias = "y_axis",
        alias = "y",
        default,
        deserialize_with = "flexible_f64"
    )]
    pub yaxis: Option<f64>,
    #[serde(rename = "width", alias = "Width", default, deserialize_with = "flexible_f64")]
    pub width: Option<f64>,
    #[serde(rename = "height", alias = "Height", default, deserialize_with = "flexible_f64")]
    pub height: Option<f64>,
    #[serde(
        rename = "pageNumber",
        alias = "PageNumber",
        alias = "page_number",
        default,
        deserialize_with = "flexible_f64"
    )]
    pub page_number: Option<f64>,
    #[serde(rename = "CreatedBy", alias = "createdBy", alias = "created_by", default)]
    pub created_by: Option<String>,
    #[serde(rename = "CreatedDate", alias = "createdDate", alias = "created_date", default)]
    pub created_date: Option<String>,
}

impl PersistedRestriction {
    /// Build the persisted form of a validated payload
    pub fn from_new(document_id: &str, payload: &NewRestriction) -> Self {
        Self {
            id: None,
            document_id: Some(document_id.to_string()),
            field: payload.field.clone(),
            reason: Some(payload.reason.trim().to_string()),
            user_id: payload.subject_user.clone(),
            user_role: payload.subject_role.clone(),
            restricted_type: Some(payload.kind.as_persisted().to_string()),
            xaxis: Some(payload.rect.x),
            yaxis: Some(payload.rect.y),
            width: Some(payload.rect.width),
            height: Some(payload.rect.height),
            page_number: Some(payload.page_number as f64),
            created_by: payload.created_by.clone(),
            created_date: None,
        }
    }

    /// Normalize into a `Restriction`. Missing coordinates become zero and
    /// yield a degenerate rect that renderers skip.
    pub fn into_restriction(self, document_id: &str) -> Restriction {
        let page_number = match self.page_number {
            Some(page) if page.is_finite() && page >= 1.0 => page as u32,
            _ => 1,
        };
        Restriction {
            id: self.id,
            document_id: self
                .document_id
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| document_id.to_string()),
            kind: RestrictionKind::from_persisted(self.restricted_type.as_deref()),
            field: self.field,
            rect: Rect::new(
                self.xaxis.unwrap_or(0.0),
                self.yaxis.unwrap_or(0.0),
                self.width.unwrap_or(0.0),
                self.height.unwrap_or(0.0),
            ),
            page_number,
            subject_role: self.user_role,
            subject_user: self.user_id,
            reason: self.reason.unwrap_or_default(),
            created_by: self.created_by,
            created_date: self.created_date,
        }
    }
}

/// Parse a backend list response, skipping records that cannot be read
pub fn parse_persisted_list(value: serde_json::Value) -> Vec<PersistedRestriction> {
    let items = match value {
        serde_json::Value::Array(items) => items,
        // Some deployments wrap the list
        serde_json::Value::Object(mut map) => {
            match map.remove("restrictions").or_else(|| map.remove("data")) {
                Some(serde_json::Value::Array(items)) => items,
                _ => {
                    tracing::warn!("Restriction list response has no array payload");
                    return Vec::new();
                }
            }
        }
        _ => {
            tracing::warn!("Restriction list response is not a JSON array");
            return Vec::new();
        }
    };

    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value::<PersistedRestriction>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!("Skipping corrupt restriction at index {}: {}", index, e);
                None
            }
        })
        .collect()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrString::Text(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("expected a number, got {:?}", s))),
    }
}

fn flexible_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrString>::deserialize(deserializer)? {
        None => None,
        Some(NumberOrString::Number(n)) if n.fract() == 0.0 => Some(format!("{}", n as i64)),
        Some(NumberOrString::Number(n)) => Some(n.to_string()),
        Some(NumberOrString::Text(s)) => Some(s),
    })
}
