use crate::analysis::amount::parse_amount;
use crate::analysis::dates::{format_date_ymd, format_naive_date, parse_ymd};
use crate::analysis::schedule::{clamp_installment_count, generate_installments, sync_progress};
use crate::models::debt::{Debt, DebtKind};
use crate::models::settings::DecimalConvention;
use chrono::NaiveDate;
use serde_json::{json, Map, Value};

/// Field names written by the first release of the widget.
const LEGACY_KEYS: &[(&str, &str)] = &[
    ("descripcion", "description"),
    ("monto", "amount"),
    ("fecha", "nextDueDate"),
    ("estado", "status"),
    ("creadaEn", "createdDate"),
];

/// Load the stored `debts` blob into typed debts, upgrading older records on the
/// way. Malformed JSON yields an empty collection; individual records that
/// still can't be read are skipped.
pub fn migrate_debts(raw: &str, today: NaiveDate, convention: DecimalConvention) -> Vec<Debt> {
    let parsed = match serde_json::from_str::<Value>(raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Stored debts are not valid JSON, starting empty: {e}");
            return Vec::new();
        }
    };

    let Value::Array(records) = parsed else {
        log::warn!("Stored debts are not a list, starting empty");
        return Vec::new();
    };

    let mut repaired = 0usize;
    let debts: Vec<Debt> = records
        .into_iter()
        .filter_map(|record| {
            let upgraded = migrate_record(record, today, convention)?;
            match serde_json::from_value::<Debt>(upgraded) {
                Ok(mut debt) => {
                    if repair_schedule(&mut debt) {
                        repaired += 1;
                    }
                    sync_progress(&mut debt);
                    Some(debt)
                }
                Err(e) => {
                    log::warn!("Skipping unreadable debt record: {e}");
                    None
                }
            }
        })
        .collect();

    if repaired > 0 {
        log::debug!("Synthesized schedules for {repaired} legacy installment debts");
    }

    debts
}

/// Synthesize the schedule of an installment debt stored without one. Returns
/// whether anything changed; a debt that already has a schedule is left alone.
pub fn repair_schedule(debt: &mut Debt) -> bool {
    let first_due = debt.next_due_date.unwrap_or(debt.created_date);
    let DebtKind::Installments {
        installment_count,
        cadence,
        paid_count,
        schedule,
    } = &mut debt.kind
    else {
        return false;
    };

    if !schedule.is_empty() {
        return false;
    }

    *installment_count = clamp_installment_count(i64::from(*installment_count));
    let mut synthesized = generate_installments(debt.amount, *installment_count, first_due, *cadence);
    for installment in synthesized.iter_mut().take(*paid_count as usize) {
        installment.paid = true;
    }
    *schedule = synthesized;

    log::debug!("Repaired schedule for debt {}", debt.id);
    sync_progress(debt);
    true
}

fn migrate_record(record: Value, today: NaiveDate, convention: DecimalConvention) -> Option<Value> {
    let Value::Object(mut map) = record else {
        log::warn!("Skipping debt record that is not an object");
        return None;
    };

    for (legacy, current) in LEGACY_KEYS {
        if let Some(value) = map.remove(*legacy) {
            map.entry(current.to_string()).or_insert(value);
        }
    }

    let id = match map.get("id") {
        Some(Value::String(id)) if !id.trim().is_empty() => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    };
    map.insert("id".to_string(), json!(id));

    let description = map
        .get("description")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .unwrap_or("Untitled debt")
        .to_string();
    map.insert("description".to_string(), json!(description));

    let amount = map
        .get("amount")
        .map(|value| parse_amount(value, convention))
        .unwrap_or(0.0);
    map.insert("amount".to_string(), json!(amount));

    let status = match map.get("status").and_then(Value::as_str) {
        Some("paid") | Some("pagada") => "paid",
        _ => "pending",
    };
    map.insert("status".to_string(), json!(status));

    let created = normalize_date(&map, "createdDate").unwrap_or(today);
    map.insert("createdDate".to_string(), json!(format_naive_date(created)));

    let kind = normalize_kind(map.get("kind"));
    map.insert("kind".to_string(), json!(kind));

    match normalize_date(&map, "nextDueDate") {
        Some(date) => {
            map.insert("nextDueDate".to_string(), json!(format_naive_date(date)));
        }
        None if kind == "oneTime" => {
            map.insert("nextDueDate".to_string(), json!(format_naive_date(created)));
        }
        None => {
            map.remove("nextDueDate");
        }
    }

    if kind != "oneTime" {
        let cadence = normalize_cadence(map.get("cadence"));
        map.insert("cadence".to_string(), json!(cadence));
    }

    if kind == "installments" {
        // An existing schedule is authoritative for the count.
        let scheduled = map
            .get("schedule")
            .and_then(Value::as_array)
            .map(Vec::len)
            .filter(|len| *len > 0);
        let count = match scheduled {
            Some(len) => clamp_installment_count(i64::try_from(len).unwrap_or(i64::MAX)),
            None => clamp_installment_count(read_integer(map.get("installmentCount")).unwrap_or(1)),
        };
        map.insert("installmentCount".to_string(), json!(count));

        let paid = read_integer(map.get("paidCount")).unwrap_or(0).clamp(0, i64::from(count));
        map.insert("paidCount".to_string(), json!(paid));

        if !map.get("schedule").is_some_and(Value::is_array) {
            map.remove("schedule");
        }
    }

    Some(Value::Object(map))
}

fn normalize_date(map: &Map<String, Value>, key: &str) -> Option<NaiveDate> {
    map.get(key).and_then(Value::as_str).and_then(parse_ymd)
}

fn normalize_kind(value: Option<&Value>) -> &'static str {
    let raw = value.and_then(Value::as_str).unwrap_or_default().to_lowercase();
    match raw.as_str() {
        "installments" | "installment" | "cuotas" => "installments",
        "recurring" | "recurrente" => "recurring",
        _ => "oneTime",
    }
}

fn normalize_cadence(value: Option<&Value>) -> &'static str {
    let raw = value.and_then(Value::as_str).unwrap_or_default().to_lowercase();
    match raw.as_str() {
        "weekly" | "semanal" => "weekly",
        "quincena" | "quincenal" | "biweekly" => "quincena",
        "annual" | "yearly" | "anual" => "annual",
        _ => "monthly",
    }
}

fn read_integer(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().map(|f| f as i64)),
        Value::String(raw) => raw.trim().parse::<i64>().ok(),
        _ => None,
    }
}
