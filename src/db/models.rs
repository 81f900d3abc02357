use serde::{Deserialize, Deserializer, Serialize};

/// A row of the `users` table as surfaced through the API.
///
/// Built from a row whose keys were already camelCased, so any column the
/// struct does not know about, or any column it expects but does not find,
/// is a decode error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct User {
    pub id: i64,
    pub created_at: String,
    pub updated_at: String,
    pub username: String,
    #[serde(deserialize_with = "present_nullable")]
    pub bio: Option<String>,
}

/// Accepts null but, unlike a plain `Option` field, not a missing key.
fn present_nullable<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer)
}
