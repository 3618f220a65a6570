use serde::Deserialize;
use serde_json::Value;

/// Known key names per logical field, tried in order.
///
/// Payloads from the target app are loosely shaped: the same logical field
/// shows up under several spellings depending on the endpoint. Each list is
/// searched front to back and the first present value wins.
#[derive(Deserialize, Clone, Debug)]
pub struct FieldAliases {
    #[serde(default = "default_collection")]
    pub collection: Vec<String>,
    #[serde(default = "default_deadline")]
    pub deadline: Vec<String>,
    #[serde(default = "default_id")]
    pub id: Vec<String>,
    #[serde(default = "default_lots")]
    pub lots: Vec<String>,
    #[serde(default = "default_lot_name")]
    pub lot_name: Vec<String>,
    #[serde(default = "default_lot_value")]
    pub lot_value: Vec<String>,
}

fn owned(keys: &[&str]) -> Vec<String> {
    keys.iter().map(|k| k.to_string()).collect()
}

fn default_collection() -> Vec<String> {
    owned(&["editais", "items", "results"])
}
fn default_deadline() -> Vec<String> {
    owned(&[
        "dataLimite",
        "data_limite",
        "data",
        "datafim",
        "dataFim",
        "dt_limite",
        "deadline",
        "prazo",
    ])
}
fn default_id() -> Vec<String> {
    owned(&["id", "_id", "codigo"])
}
fn default_lots() -> Vec<String> {
    owned(&["lotes", "lots", "items", "propostas"])
}
fn default_lot_name() -> Vec<String> {
    owned(&["nome", "name"])
}
fn default_lot_value() -> Vec<String> {
    owned(&["valor", "value", "preco", "price"])
}

impl Default for FieldAliases {
    fn default() -> Self {
        Self {
            collection: default_collection(),
            deadline: default_deadline(),
            id: default_id(),
            lots: default_lots(),
            lot_name: default_lot_name(),
            lot_value: default_lot_value(),
        }
    }
}

/// Null, `false`, zero and the empty string count as missing.
pub fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// First alias of `aliases` holding a present value in `obj`.
pub fn first_present<'a>(obj: &'a Value, aliases: &[String]) -> Option<&'a Value> {
    let map = obj.as_object()?;
    aliases
        .iter()
        .filter_map(|key| map.get(key))
        .find(|v| is_present(v))
}

/// Renders a scalar as text the way it would print in the page: strings
/// unquoted, numbers in their JSON form. Containers and null yield `None`.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Announcement list of a payload: a top-level array, or the array held by
/// the first present collection alias.
pub fn editais_of<'a>(payload: &'a Value, aliases: &FieldAliases) -> &'a [Value] {
    if let Some(list) = payload.as_array() {
        return list;
    }
    first_present(payload, &aliases.collection)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Line items of one announcement.
pub fn lots_of<'a>(edital: &'a Value, aliases: &FieldAliases) -> &'a [Value] {
    first_present(edital, &aliases.lots)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

pub fn id_of(edital: &Value, aliases: &FieldAliases) -> Option<String> {
    first_present(edital, &aliases.id).and_then(scalar_text)
}
