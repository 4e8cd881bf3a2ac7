use lumen_shared::NoteToLightMap;
use serde_json::{Map, Value};

/// Key every serializable engine object uses to carry its concrete type.
pub const OBJECT_TYPE_KEY: &str = "objectType";

/// Tolerant reader for the persisted-state schema. An absent or mistyped key
/// leaves the target untouched and surfaces through the log, so a damaged
/// document degrades instead of failing the whole load.
pub struct JsonHelper<'a> {
    user: &'static str,
    json: &'a Value,
    log_missing_keys: bool,
}

impl<'a> JsonHelper<'a> {
    pub fn new(user: &'static str, json: &'a Value) -> Self {
        Self {
            user,
            json,
            log_missing_keys: true,
        }
    }

    pub fn ignoring_missing_keys(user: &'static str, json: &'a Value) -> Self {
        Self {
            user,
            json,
            log_missing_keys: false,
        }
    }

    /// Reads `key` into `target` when present and well-typed. Returns whether
    /// the target was written.
    pub fn get_item_if_present<T: FromJsonValue>(&self, key: &str, target: &mut T) -> bool {
        let Some(item) = self.json.get(key) else {
            if self.log_missing_keys {
                log::error!("{}: missing JSON key '{}'", self.user, key);
            }
            return false;
        };

        match T::from_json_value(item) {
            Some(value) => {
                *target = value;
                true
            }
            None => {
                log::error!("{}: JSON value with key '{}' has the wrong type", self.user, key);
                false
            }
        }
    }

    /// Returns the nested object stored under `key`, if present and an object.
    pub fn object_if_present(&self, key: &str) -> Option<&'a Value> {
        match self.json.get(key) {
            Some(item) if item.is_object() => Some(item),
            Some(_) => {
                log::error!("{}: JSON value with key '{}' is not an object", self.user, key);
                None
            }
            None => {
                if self.log_missing_keys {
                    log::error!("{}: missing JSON key '{}'", self.user, key);
                }
                None
            }
        }
    }

    /// Returns the array stored under `key`, if present and an array.
    pub fn array_if_present(&self, key: &str) -> Option<&'a [Value]> {
        match self.json.get(key) {
            Some(Value::Array(items)) => Some(items.as_slice()),
            Some(_) => {
                log::error!("{}: JSON value with key '{}' is not an array", self.user, key);
                None
            }
            None => {
                if self.log_missing_keys {
                    log::error!("{}: missing JSON key '{}'", self.user, key);
                }
                None
            }
        }
    }
}

/// Conversion from a JSON value into a concrete schema type. `None` means a
/// type mismatch, never a lossy cast.
pub trait FromJsonValue: Sized {
    fn from_json_value(value: &Value) -> Option<Self>;
}

impl FromJsonValue for bool {
    fn from_json_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl FromJsonValue for u8 {
    fn from_json_value(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|raw| u8::try_from(raw).ok())
    }
}

impl FromJsonValue for u16 {
    fn from_json_value(value: &Value) -> Option<Self> {
        value.as_u64().and_then(|raw| u16::try_from(raw).ok())
    }
}

impl FromJsonValue for f32 {
    fn from_json_value(value: &Value) -> Option<Self> {
        value.as_f64().map(|raw| raw as f32)
    }
}

impl FromJsonValue for String {
    fn from_json_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }
}

/// Serializes a note-to-light map as an object with stringified note numbers
/// for keys.
pub fn note_to_light_map_to_json(map: &NoteToLightMap) -> Value {
    let mut object = Map::new();
    for (note, light) in map {
        object.insert(note.to_string(), Value::from(*light));
    }
    Value::Object(object)
}

/// Rebuilds a note-to-light map, skipping entries whose key or value does not
/// parse.
pub fn note_to_light_map_from_json(value: &Value) -> NoteToLightMap {
    let mut map = NoteToLightMap::new();

    let Some(object) = value.as_object() else {
        log::error!("note-to-light map is not a JSON object");
        return map;
    };

    for (key, item) in object {
        let note = key.parse::<u8>().ok();
        let light = item.as_u64().and_then(|raw| u16::try_from(raw).ok());
        match (note, light) {
            (Some(note), Some(light)) => {
                map.insert(note, light);
            }
            _ => log::error!("skipping malformed note-to-light entry '{key}': {item}"),
        }
    }
    map
}
