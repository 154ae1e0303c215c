use {
    imbridge_guid::{Guid, HandleKind},
    serde_json::{Value, json},
};

/// JSON description of a parsed identifier.
pub fn describe(raw: &str) -> Value {
    let guid = Guid::parse(raw);
    json!({
        "input": raw,
        "formatted": guid.format(),
        "service": guid.service().map(|s| s.tag().to_string()),
        "style": guid.style().map(|s| s.tag().to_string()),
        "local": guid.local(),
        "qualified": guid.is_qualified(),
        "group": guid.is_group(),
        "handle_kind": format!("{:?}", HandleKind::classify(guid.local())),
        "alternate": guid.alternate().map(|alt| alt.format()),
    })
}

pub fn print_parsed(raw: &str) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&describe(raw))?);
    Ok(())
}
