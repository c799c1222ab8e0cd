//! Entity mapping: resolve each extracted mention to a concrete node through
//! the full-text indexes (or, for opening hours, an exact `OfficeHour` match).

use std::fmt::Write as _;

use serde_json::{Value, json};
use tracing::{debug, warn};

use super::entities::PaysokoEntities;
use crate::config::IndexNames;
use crate::graph::{GraphClient, Row};

const FULLTEXT_QUERY: &str = r#"
CALL db.index.fulltext.queryNodes($indexName, $value)
YIELD node, score
WITH node, score, labels(node)[0] AS type
RETURN
    CASE type
        WHEN 'OfficeLocation' THEN node.location_name
        WHEN 'Services' THEN node.service_name
        WHEN 'Appointment' THEN node.appointment_id
    END AS result,
    type,
    score
ORDER BY score DESC
LIMIT 1
"#;

const HOURS_QUERY: &str = r#"
MATCH (h:OfficeHour)
WHERE h.day_of_week = $time OR h.opening_time = $time OR h.closing_time = $time
RETURN
    h.day_of_week + ' ' + h.opening_time + '-' + h.closing_time AS result,
    'OfficeHour' AS type,
    1.0 AS score
LIMIT 1
"#;

/// Map every mention to a database value, one line per mention.
///
/// Returns `None` when nothing produced a line (no mentions, or every lookup
/// failed).
pub async fn map_to_database(
    graph: &GraphClient,
    indexes: &IndexNames,
    entities: &PaysokoEntities,
) -> Option<String> {
    let mut out = String::new();

    let groups = [
        (indexes.location.as_str(), &entities.office_locations),
        (indexes.service.as_str(), &entities.services),
        (indexes.appointment.as_str(), &entities.appointments),
    ];
    for (index, mentions) in groups {
        for mention in mentions {
            let params = json!({ "indexName": index, "value": escape_lucene(mention) });
            match graph.query(FULLTEXT_QUERY, params).await {
                Ok(rows) => push_line(&mut out, mention, rows.first()),
                Err(e) => warn!(%mention, index, error = %e, "entity lookup failed"),
            }
        }
    }

    for time in &entities.office_hours {
        match graph.query(HOURS_QUERY, json!({ "time": time })).await {
            Ok(rows) => push_line(&mut out, time, rows.first()),
            Err(e) => warn!(mention = %time, error = %e, "office-hour lookup failed"),
        }
    }

    debug!(lines = out.lines().count(), "entities mapped");
    if out.is_empty() { None } else { Some(out) }
}

fn push_line(out: &mut String, mention: &str, row: Option<&Row>) {
    match row {
        Some(row) => {
            let score = row.get("score").and_then(Value::as_f64).unwrap_or(0.0);
            let _ = writeln!(
                out,
                "{mention} maps to {} ({}) with score {score:.2}",
                display(row.get("result")),
                display(row.get("type")),
            );
        }
        None => {
            let _ = writeln!(out, "No match found for {mention}");
        }
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "None".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Backslash-escape Lucene query syntax so a mention is searched literally.
pub fn escape_lucene(text: &str) -> String {
    const SPECIAL: &[char] = &[
        '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
    ];
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if SPECIAL.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::fixture::FixtureGraph;

    fn entities() -> PaysokoEntities {
        PaysokoEntities {
            office_locations: vec!["CBD".into()],
            services: vec!["Money Transfer".into()],
            appointments: vec!["APT404".into()],
            office_hours: vec!["monday".into()],
        }
    }

    #[tokio::test]
    async fn maps_each_mention_in_order() {
        let graph = GraphClient::Fixture(
            FixtureGraph::new()
                .on_params(
                    "queryNodes",
                    json!({ "indexName": "locationIndex", "value": "CBD" }),
                    vec![json!({ "result": "Paysoko CBD", "type": "OfficeLocation", "score": 2.4567 })],
                )
                .on_params(
                    "queryNodes",
                    json!({ "indexName": "serviceIndex", "value": "Money Transfer" }),
                    vec![json!({ "result": "Money Transfer", "type": "Services", "score": 3 })],
                )
                .on(
                    "MATCH (h:OfficeHour)",
                    vec![json!({ "result": "monday 08:00-17:00", "type": "OfficeHour", "score": 1.0 })],
                ),
        );

        let text = map_to_database(&graph, &IndexNames::default(), &entities()).await.unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "CBD maps to Paysoko CBD (OfficeLocation) with score 2.46",
                "Money Transfer maps to Money Transfer (Services) with score 3.00",
                "No match found for APT404",
                "monday maps to monday 08:00-17:00 (OfficeHour) with score 1.00",
            ]
        );
    }

    #[tokio::test]
    async fn configured_index_names_are_used() {
        let fixture = FixtureGraph::new();
        let graph = GraphClient::Fixture(fixture.clone());
        let indexes = IndexNames {
            location: "locIdx".into(),
            service: "svcIdx".into(),
            appointment: "aptIdx".into(),
        };
        let e = PaysokoEntities { services: vec!["Loans".into()], ..Default::default() };
        map_to_database(&graph, &indexes, &e).await;
        let calls = fixture.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1["indexName"], "svcIdx");
    }

    #[tokio::test]
    async fn failed_lookup_is_skipped() {
        let graph = GraphClient::Fixture(
            FixtureGraph::new()
                .fail_on("queryNodes", "index does not exist")
                .on(
                    "MATCH (h:OfficeHour)",
                    vec![json!({ "result": "monday 08:00-17:00", "type": "OfficeHour", "score": 1.0 })],
                ),
        );
        let text = map_to_database(&graph, &IndexNames::default(), &entities()).await.unwrap();
        assert_eq!(text, "monday maps to monday 08:00-17:00 (OfficeHour) with score 1.00\n");
    }

    #[tokio::test]
    async fn no_mentions_is_none() {
        let graph = GraphClient::Fixture(FixtureGraph::new());
        let text = map_to_database(&graph, &IndexNames::default(), &PaysokoEntities::default()).await;
        assert!(text.is_none());
    }

    #[tokio::test]
    async fn null_result_renders_as_none() {
        let graph = GraphClient::Fixture(FixtureGraph::new().on(
            "queryNodes",
            vec![json!({ "result": null, "type": "Customer", "score": 0.5 })],
        ));
        let e = PaysokoEntities { office_locations: vec!["x".into()], ..Default::default() };
        let text = map_to_database(&graph, &IndexNames::default(), &e).await.unwrap();
        assert_eq!(text, "x maps to None (Customer) with score 0.50\n");
    }

    #[tokio::test]
    async fn mentions_are_escaped_for_lucene() {
        let fixture = FixtureGraph::new();
        let graph = GraphClient::Fixture(fixture.clone());
        let e = PaysokoEntities { appointments: vec!["APT-001?".into()], ..Default::default() };
        let text = map_to_database(&graph, &IndexNames::default(), &e).await.unwrap();
        assert_eq!(fixture.calls()[0].1["value"], "APT\\-001\\?");
        assert_eq!(text, "No match found for APT-001?\n");
    }

    #[test]
    fn escape_leaves_plain_text_alone() {
        assert_eq!(escape_lucene("Paysoko CBD"), "Paysoko CBD");
        assert_eq!(escape_lucene("a:b (c)"), "a\\:b \\(c\\)");
    }
}
