//! Read-API rows to native records.

use {
    crate::record::{AcknowledgmentRecord, MessageRecord, NativeRecord, OpaqueRecord},
    imbridge_service_traits::Row,
    serde_json::Value,
};

const ACKNOWLEDGMENT_TYPES: std::ops::RangeInclusive<i64> = 2000..=3999;

fn string(row: &Row, column: &str) -> Option<String> {
    match row.get(column)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn integer(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn flag(row: &Row, column: &str) -> bool {
    integer(row, column).is_some_and(|v| v != 0)
}

fn strings(row: &Row, column: &str) -> Vec<String> {
    match row.get(column) {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

/// Decode one row. Never fails; rows that are neither messages nor
/// acknowledgments become [`OpaqueRecord`]s.
pub fn decode_row(row: &Row) -> Box<dyn NativeRecord> {
    let associated_type = integer(row, "associated_message_type").unwrap_or(0);
    let item_type = integer(row, "item_type").unwrap_or(0);

    if ACKNOWLEDGMENT_TYPES.contains(&associated_type) {
        return Box::new(AcknowledgmentRecord {
            guid: string(row, "guid").unwrap_or_default(),
            chat_guid: string(row, "chat_guid"),
            from_me: flag(row, "is_from_me"),
            date: integer(row, "date").unwrap_or(0),
            sender: string(row, "handle_id"),
            associated_guid: string(row, "associated_message_guid").unwrap_or_default(),
            associated_type,
        });
    }

    if item_type == 0 {
        return Box::new(MessageRecord {
            guid: string(row, "guid").unwrap_or_default(),
            chat_guid: string(row, "chat_guid"),
            from_me: flag(row, "is_from_me"),
            date: integer(row, "date").unwrap_or(0),
            sender: string(row, "handle_id"),
            text: string(row, "text"),
            subject: string(row, "subject"),
            service: string(row, "service"),
            attachment_guids: strings(row, "attachment_guids"),
            thread_identifier: string(row, "thread_identifier"),
            thread_originator_guid: string(row, "thread_originator_guid"),
        });
    }

    let type_name = string(row, "class").unwrap_or_else(|| format!("item_type:{item_type}"));
    Box::new(OpaqueRecord {
        type_name,
        columns: row.clone(),
    })
}
