use std::fmt::{Display, Formatter};

use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize,
};
use serde_json::Value;

use crate::{
    report::{Message, Report},
    util::*,
};

// members written by every message; args never replace them
const FIXED_FIELDS: [&str; 6] = ["level", "domain", "keyword", "schema", "instance", "message"];

impl Message {
    /// The message as a json object, with args inlined. Args named like
    /// one of the fixed members are left out.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Report {
    /// All retained messages as a json array.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl Serialize for Message {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("level", &self.level)?;
        map.serialize_entry("domain", &self.domain)?;
        if let Some(kw) = &self.keyword {
            map.serialize_entry("keyword", kw)?;
        }
        if let Some(schema) = &self.schema {
            map.serialize_entry("schema", &schema.to_string())?;
        }
        map.serialize_entry("instance", &self.instance.to_string())?;
        map.serialize_entry("message", &self.text)?;
        for (name, value) in &self.args {
            if FIXED_FIELDS.contains(&name.as_str()) {
                continue;
            }
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

impl Serialize for Report {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for msg in self.iter() {
            seq.serialize_element(msg)?;
        }
        seq.end()
    }
}

impl Display for Message {
    /// `{:#}` also prints the schema location.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] ", self.level)?;
        if let Some(kw) = &self.keyword {
            write!(f, "{kw}: ")?;
        }
        write!(f, "at {}: {}", quote(&self.instance.to_string()), self.text)?;
        if f.alternate() {
            if let Some(schema) = &self.schema {
                write!(f, " (schema {})", quote(&schema.to_string()))?;
            }
        }
        Ok(())
    }
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_success() {
            write!(f, "success")?;
        } else {
            write!(f, "failure")?;
        }
        for msg in self.iter() {
            if f.alternate() {
                write!(f, "\n  {msg:#}")?;
            } else {
                write!(f, "\n  {msg}")?;
            }
        }
        Ok(())
    }
}
