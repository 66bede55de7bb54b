//! Record schema variants and request → row mapping.
//!
//! Two fixed column layouts exist. The active one is chosen at deployment time
//! (`ServiceConfig::schema_variant`), never per request. Header text and column
//! order are a compatibility contract with every existing document: do not
//! reorder or rename.
//!
//! Request bodies are plain JSON objects with camelCase keys. Field values are
//! coerced to text: numbers and booleans are rendered, `null`/missing become "".
//! Missing fields never shift a column.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AppError, AppResult};

/// Variant A header (7 columns).
pub const VARIANT_A_HEADER: [&str; 7] = ["受信日時", "No", "部材", "変状番号", "変状名", "寸法", "入力時刻"];

/// Variant B header (17 columns), the field inspection sheet.
pub const VARIANT_B_HEADER: [&str; 17] = [
    "No.", "前回調書", "同ｱﾝｸﾞﾙ写", "写真番号", "応急措置写真",
    "部材", "材料", "要素番号", "変状", "程度",
    "ひび間隔", "ひび幅", "数量(m)", "判定", "進行",
    "第三者被害", "備考",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum SchemaVariant {
    #[serde(rename = "a", alias = "A", alias = "variant_a")]
    A,
    #[default]
    #[serde(rename = "b", alias = "B", alias = "variant_b")]
    B,
}

impl SchemaVariant {
    pub fn header(&self) -> &'static [&'static str] {
        match self {
            SchemaVariant::A => &VARIANT_A_HEADER,
            SchemaVariant::B => &VARIANT_B_HEADER,
        }
    }

    /// (1-based column, width px) for the main columns.
    pub fn column_widths(&self) -> &'static [(u32, u32)] {
        match self {
            SchemaVariant::A => &[(1, 150), (3, 100), (5, 150), (6, 120)],
            SchemaVariant::B => &[(1, 50), (2, 60), (4, 60), (6, 120), (9, 120), (13, 80), (17, 200)],
        }
    }

    /// Decode the variant-specific fields of a request object.
    pub fn parse_record(&self, body: &Value) -> AppResult<RecordInput> {
        let bad = |e: serde_json::Error| AppError::validation("invalid_field".to_string(), format!("invalid record field: {}", e));
        match self {
            SchemaVariant::A => Ok(RecordInput::A(VariantARecord::deserialize(body).map_err(bad)?)),
            SchemaVariant::B => {
                let body = without_shadowed_alias(body, "damage", "damageId");
                Ok(RecordInput::B(VariantBRecord::deserialize(&*body).map_err(bad)?))
            }
        }
    }
}

impl fmt::Display for SchemaVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaVariant::A => write!(f, "a"),
            SchemaVariant::B => write!(f, "b"),
        }
    }
}

impl FromStr for SchemaVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" | "variant_a" | "7" => Ok(SchemaVariant::A),
            "b" | "variant_b" | "17" => Ok(SchemaVariant::B),
            other => Err(format!("unknown schema variant '{}' (expected a or b)", other)),
        }
    }
}

/// Variant A fields. The receipt time and No columns are generated.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VariantARecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub member: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub damage_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub damage_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dimensions: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub input_time: String,
}

/// Variant B fields, in header order after "No.".
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VariantBRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub prev_record: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub same_angle_photo: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub photo_no: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub emergency_photo: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub member: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub material: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub element_number: String,
    /// Entered as a damage number by the field client, hence the alias.
    #[serde(default, alias = "damageId", deserialize_with = "lenient_string")]
    pub damage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub degree: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub crack_spacing: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub crack_width: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub dimensions: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub judgment: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub progression: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub third_party_damage: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub remarks: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordInput {
    A(VariantARecord),
    B(VariantBRecord),
}

impl RecordInput {
    pub fn variant(&self) -> SchemaVariant {
        match self {
            RecordInput::A(_) => SchemaVariant::A,
            RecordInput::B(_) => SchemaVariant::B,
        }
    }

    /// Lay the record out on its variant's fixed columns.
    pub fn to_row(&self, sequence: usize, received_at: &str) -> Vec<String> {
        match self {
            RecordInput::A(r) => vec![
                received_at.to_string(),
                sequence.to_string(),
                r.member.clone(),
                r.damage_id.clone(),
                r.damage_name.clone(),
                r.dimensions.clone(),
                r.input_time.clone(),
            ],
            RecordInput::B(r) => vec![
                sequence.to_string(),
                r.prev_record.clone(),
                r.same_angle_photo.clone(),
                r.photo_no.clone(),
                r.emergency_photo.clone(),
                r.member.clone(),
                r.material.clone(),
                r.element_number.clone(),
                r.damage.clone(),
                r.degree.clone(),
                r.crack_spacing.clone(),
                r.crack_width.clone(),
                r.dimensions.clone(),
                r.judgment.clone(),
                r.progression.clone(),
                r.third_party_damage.clone(),
                r.remarks.clone(),
            ],
        }
    }
}

/// A validated append request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendRequest {
    pub file_id: String,
    /// `None` when absent or empty; the configured default applies.
    pub sheet_name: Option<String>,
    pub record: RecordInput,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    #[serde(default, alias = "documentId", deserialize_with = "lenient_string")]
    file_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    sheet_name: String,
}

impl AppendRequest {
    /// Parse a raw request body for the active variant.
    pub fn parse(body: &[u8], variant: SchemaVariant) -> AppResult<Self> {
        let value: Value = serde_json::from_slice(body).map_err(|e| {
            AppError::validation("invalid_json".to_string(), format!("request body is not valid JSON: {}", e))
        })?;
        if !value.is_object() {
            return Err(AppError::validation("invalid_json", "request body must be a JSON object"));
        }
        let env = Envelope::deserialize(&*without_shadowed_alias(&value, "fileId", "documentId")).map_err(|e| {
            AppError::validation("invalid_field".to_string(), format!("invalid request field: {}", e))
        })?;
        if env.file_id.trim().is_empty() {
            return Err(AppError::validation("file_id_missing", "fileId is required (target file id missing)"));
        }
        let record = variant.parse_record(&value)?;
        Ok(Self {
            file_id: env.file_id.trim().to_string(),
            sheet_name: if env.sheet_name.is_empty() { None } else { Some(env.sheet_name) },
            record,
        })
    }
}

/// A key accepted under two names: when both are sent, `primary` wins and
/// `alias` is ignored instead of failing as a duplicate field.
fn without_shadowed_alias<'v>(body: &'v Value, primary: &str, alias: &str) -> Cow<'v, Value> {
    match body.as_object() {
        Some(map) if map.contains_key(primary) && map.contains_key(alias) => {
            let mut owned = body.clone();
            if let Some(m) = owned.as_object_mut() { m.remove(alias); }
            Cow::Owned(owned)
        }
        _ => Cow::Borrowed(body),
    }
}

/// Render a JSON scalar as cell text.
pub fn coerce_text(v: Option<&Value>) -> Result<String, String> {
    match v {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Bool(b)) => Ok(b.to_string()),
        Some(Value::Array(_)) => Err("expected text, found array".to_string()),
        Some(Value::Object(_)) => Err("expected text, found object".to_string()),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let v = Option::<Value>::deserialize(d)?;
    coerce_text(v.as_ref()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_have_fixed_widths() {
        assert_eq!(SchemaVariant::A.header().len(), 7);
        assert_eq!(SchemaVariant::B.header().len(), 17);
        assert_eq!(SchemaVariant::A.header()[0], "受信日時");
        assert_eq!(SchemaVariant::B.header()[16], "備考");
    }

    #[test]
    fn variant_from_str_and_serde() {
        assert_eq!("A".parse::<SchemaVariant>().unwrap(), SchemaVariant::A);
        assert_eq!("17".parse::<SchemaVariant>().unwrap(), SchemaVariant::B);
        assert!("c".parse::<SchemaVariant>().is_err());
        let v: SchemaVariant = serde_json::from_value(json!("variant_a")).unwrap();
        assert_eq!(v, SchemaVariant::A);
    }

    #[test]
    fn missing_file_id_is_validation_error() {
        let err = AppendRequest::parse(r#"{"member":"主桁"}"#.as_bytes(), SchemaVariant::B).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert!(err.message().contains("fileId"));

        let err = AppendRequest::parse(br#"{"fileId":"   "}"#, SchemaVariant::B).unwrap_err();
        assert_eq!(err.code_str(), "file_id_missing");
    }

    #[test]
    fn malformed_bodies_are_rejected() {
        assert_eq!(AppendRequest::parse(b"not json", SchemaVariant::A).unwrap_err().code_str(), "invalid_json");
        assert_eq!(AppendRequest::parse(b"[1,2]", SchemaVariant::A).unwrap_err().code_str(), "invalid_json");
        let err = AppendRequest::parse(br#"{"fileId":"x","member":["a"]}"#, SchemaVariant::B).unwrap_err();
        assert_eq!(err.code_str(), "invalid_field");
    }

    #[test]
    fn coerces_scalars_and_keeps_columns_fixed() {
        let body = json!({
            "fileId": "doc-1",
            "sheetName": "",
            "photoNo": 12,
            "damageId": "⑦",
            "crackWidth": 0.2,
            "remarks": null,
        });
        let req = AppendRequest::parse(body.to_string().as_bytes(), SchemaVariant::B).unwrap();
        assert_eq!(req.file_id, "doc-1");
        assert_eq!(req.sheet_name, None);
        let row = req.record.to_row(3, "");
        assert_eq!(row.len(), 17);
        assert_eq!(row[0], "3");
        assert_eq!(row[3], "12");
        assert_eq!(row[8], "⑦");
        assert_eq!(row[11], "0.2");
        assert_eq!(row[16], "");
        assert!(row[1].is_empty() && row[13].is_empty());
    }

    #[test]
    fn primary_key_wins_over_its_alias() {
        let body = json!({"documentId": "alias-doc", "fileId": "main-doc", "damageId": "7", "damage": "ひびわれ"});
        let req = AppendRequest::parse(body.to_string().as_bytes(), SchemaVariant::B).unwrap();
        assert_eq!(req.file_id, "main-doc");
        let RecordInput::B(rec) = &req.record else { panic!("expected variant b") };
        assert_eq!(rec.damage, "ひびわれ");

        // damageId alone still fills the damage column
        let body = json!({"fileId": "d", "damageId": "7"});
        let req = AppendRequest::parse(body.to_string().as_bytes(), SchemaVariant::B).unwrap();
        assert_eq!(req.record.to_row(1, "")[8], "7");

        // variant A keeps damageId as its own column
        let body = json!({"fileId": "d", "damageId": "7", "damage": "x"});
        let req = AppendRequest::parse(body.to_string().as_bytes(), SchemaVariant::A).unwrap();
        assert_eq!(req.record.to_row(1, "")[3], "7");
    }

    #[test]
    fn variant_a_row_layout() {
        let body = json!({"documentId": "doc-2", "sheetName": "上面", "member": "床版", "damageName": "ひびわれ"});
        let req = AppendRequest::parse(body.to_string().as_bytes(), SchemaVariant::A).unwrap();
        assert_eq!(req.sheet_name.as_deref(), Some("上面"));
        assert_eq!(req.record.variant(), SchemaVariant::A);
        let row = req.record.to_row(1, "2026/10/17 09:30:00");
        assert_eq!(row, vec!["2026/10/17 09:30:00", "1", "床版", "", "ひびわれ", "", ""]);
    }
}
