//! render_json.rs: report JSON (cover → groups → notice → integrity).
//!
//! The writer in `wv_io::canonical_json` sorts keys, so section order here is
//! for readability of the in-memory value only.

use serde_json::{json, Map as JsonMap, Value};

use crate::{ReportModel, ReportRow, SectionCover, SectionIntegrity, SubregionGroup};

pub fn render_report_json(m: &ReportModel) -> Value {
    let mut root = obj();
    root.insert("cover".into(), cover_json(&m.cover));
    root.insert("groups".into(), Value::Array(m.groups.iter().map(group_json).collect()));
    if let Some(n) = &m.notice {
        root.insert("notice".into(), Value::String(n.clone()));
    }
    root.insert("integrity".into(), integrity_json(&m.integrity));
    Value::Object(root)
}

/* ----------------------- sections ----------------------- */

fn cover_json(c: &SectionCover) -> Value {
    json!({
        "title": c.title,
        "selection": c.selection,
        "year": c.year,
        "class_num": c.class_num,
        "budget": c.budget,
        "total_waves": c.total_waves,
        "tie_break": c.tie_break,
    })
}

fn group_json(g: &SubregionGroup) -> Value {
    let mut o = obj();
    o.insert("subregion".into(), Value::String(g.subregion.clone()));
    o.insert("waves".into(), json!(g.waves));
    o.insert("rows".into(), Value::Array(g.rows.iter().map(row_json).collect()));
    Value::Object(o)
}

fn row_json(r: &ReportRow) -> Value {
    json!({
        "state_code": r.state_code,
        "state_name": r.state_name,
        "share_pct": r.share_pct,
        "rank": r.rank,
        "missing_pct": r.missing_pct,
        "waves": r.waves,
    })
}

fn integrity_json(i: &SectionIntegrity) -> Value {
    json!({
        "waves_id": i.waves_id,
        "run_id": i.run_id,
        "records_sha256": i.records_sha256,
        "record_count": i.record_count,
        "params_sha256": i.params_sha256,
        "engine": i.engine,
    })
}

fn obj() -> JsonMap<String, Value> {
    JsonMap::new()
}
