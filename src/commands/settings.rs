use crate::commands::db::{RecordStore, CONTACT_KEY, PREFERENCES_KEY, REMINDER_TIMESTAMP_KEY};
use crate::commands::debts::SharedSession;
use crate::error::DebtError;
use crate::models::settings::{Preferences, Settings};
use serde_json::{json, Map, Value};

const PREFERENCES_SCHEMA_VERSION: i64 = 1;

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_settings(session: tauri::State<'_, SharedSession>) -> Result<Settings, String> {
    get_settings_internal(session.inner())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn save_contact(
    contact_id: Option<String>,
    session: tauri::State<'_, SharedSession>,
) -> Result<Settings, String> {
    save_contact_internal(session.inner(), contact_id)
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn get_preferences(session: tauri::State<'_, SharedSession>) -> Result<Preferences, String> {
    get_preferences_internal(session.inner())
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub async fn save_preferences(
    preferences: Value,
    session: tauri::State<'_, SharedSession>,
) -> Result<Preferences, String> {
    save_preferences_internal(session.inner(), preferences)
}

pub fn get_settings_internal(session: &SharedSession) -> Result<Settings, String> {
    let guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    Ok(guard.settings().clone())
}

pub fn save_contact_internal(session: &SharedSession, contact_id: Option<String>) -> Result<Settings, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.set_contact(contact_id);
    Ok(guard.settings().clone())
}

pub fn get_preferences_internal(session: &SharedSession) -> Result<Preferences, String> {
    let guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    Ok(guard.preferences().clone())
}

pub fn save_preferences_internal(session: &SharedSession, preferences: Value) -> Result<Preferences, String> {
    let mut guard = session.lock().map_err(|_| "Session lock error".to_string())?;
    guard.update_preferences(preferences).map_err(|e| e.to_string())
}

/// Read contact and reminder bookkeeping. Storage failures and garbage values
/// read as unset.
pub fn load_settings(store: &dyn RecordStore) -> Settings {
    let contact_id = read_key(store, CONTACT_KEY)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty());
    let scheduled_reminder_timestamp =
        read_key(store, REMINDER_TIMESTAMP_KEY).and_then(|raw| raw.trim().parse::<i64>().ok());

    Settings {
        contact_id,
        scheduled_reminder_timestamp,
    }
}

/// Store or clear the contact. Blank input clears it.
pub fn save_contact_to_store(store: &dyn RecordStore, contact_id: Option<&str>) -> Result<(), DebtError> {
    match contact_id.map(str::trim).filter(|raw| !raw.is_empty()) {
        Some(contact) => store.set(CONTACT_KEY, contact),
        None => store.remove(CONTACT_KEY),
    }
}

pub fn save_reminder_timestamp(store: &dyn RecordStore, timestamp: Option<i64>) -> Result<(), DebtError> {
    match timestamp {
        Some(ts) => store.set(REMINDER_TIMESTAMP_KEY, &ts.to_string()),
        None => store.remove(REMINDER_TIMESTAMP_KEY),
    }
}

pub fn load_preferences(store: &dyn RecordStore) -> Preferences {
    let original = read_key(store, PREFERENCES_KEY)
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        .unwrap_or_else(|| json!({}));

    let migrated = migrate_preferences(original.clone());
    if migrated != original {
        if let Err(e) = write_preferences(store, &migrated) {
            log::warn!("Failed to persist migrated preferences: {e}");
        }
    }

    typed_preferences(migrated)
}

/// Merge a partial update over the stored preferences and persist the result.
pub fn save_preferences_to_store(store: &dyn RecordStore, incoming: &Value) -> Result<Preferences, DebtError> {
    let mut merged = read_key(store, PREFERENCES_KEY)
        .and_then(|raw| serde_json::from_str::<Value>(&raw).ok())
        .unwrap_or_else(default_preferences);
    merge_preferences(&mut merged, incoming);

    let migrated = migrate_preferences(merged);
    write_preferences(store, &migrated)?;
    Ok(typed_preferences(migrated))
}

fn read_key(store: &dyn RecordStore, key: &str) -> Option<String> {
    match store.get(key) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Failed to read {key} from storage: {e}");
            None
        }
    }
}

fn write_preferences(store: &dyn RecordStore, preferences: &Value) -> Result<(), DebtError> {
    let raw = serde_json::to_string(preferences)?;
    store.set(PREFERENCES_KEY, &raw)
}

fn typed_preferences(value: Value) -> Preferences {
    serde_json::from_value(value).unwrap_or_default()
}

fn migrate_preferences(input: Value) -> Value {
    let defaults = default_preferences();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    deep_merge_defaults(&mut out, &defaults);
    sanitize_preferences(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schemaVersion".to_string(), json!(PREFERENCES_SCHEMA_VERSION));
    }

    out
}

fn default_preferences() -> Value {
    let defaults = Preferences::default();
    json!({
        "schemaVersion": PREFERENCES_SCHEMA_VERSION,
        "reminderHour": defaults.reminder_hour,
        "reminderLeadDays": defaults.reminder_lead_days,
        "decimalConvention": "auto",
        "currencySymbol": defaults.currency_symbol,
    })
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_preferences(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_preferences(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn sanitize_preferences(preferences: &mut Value) {
    let Some(obj) = preferences.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "reminderHour", 0, 23, 9);
    clamp_u64(obj, "reminderLeadDays", 0, 7, 1);
    sanitize_enum(obj, "decimalConvention", &["auto", "dot"], "auto");

    let symbol = obj
        .get("currencySymbol")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|symbol| !symbol.is_empty() && symbol.chars().count() <= 4)
        .unwrap_or("$")
        .to_string();
    obj.insert("currencySymbol".to_string(), json!(symbol));
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn sanitize_enum(map: &mut Map<String, Value>, key: &str, allowed: &[&str], default: &str) {
    let valid = map
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| allowed.contains(value))
        .unwrap_or(default);
    map.insert(key.to_string(), json!(valid));
}
