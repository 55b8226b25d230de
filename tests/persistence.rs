//! Persistence and recovery tests for the pgview engine.
//!
//! These tests verify that schema, facts, views, and the catalog survive
//! an engine restart, and that derived skolem ids are stable across the
//! persist + reopen cycle.

use std::collections::BTreeSet;

use pgview::engine::{CellValue, Engine, EngineConfig, QueryResult};

fn persistent_engine(dir: &std::path::Path) -> Engine {
    Engine::new(EngineConfig {
        data_dir: Some(dir.to_path_buf()),
        ..Default::default()
    })
    .unwrap()
}

fn edge_ids(result: &QueryResult) -> BTreeSet<u64> {
    result
        .rows
        .iter()
        .flat_map(|row| &row.cells)
        .filter_map(|cell| match &cell.value {
            CellValue::Edge { id, .. } => Some(*id),
            _ => None,
        })
        .collect()
}

#[test]
fn facts_and_schema_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    // First session: declare schema and insert facts.
    {
        let engine = persistent_engine(dir.path());
        engine
            .execute_script(
                "create node Person; \
                 create edge Knows(Person -> Person); \
                 insert N(1, \"Person\"); \
                 insert N(2, \"Person\"); \
                 insert E(10, 1, 2, \"Knows\"); \
                 insert NP(1, \"name\", \"ada\"); \
                 insert EP(10, \"since\", \"1999\");",
            )
            .unwrap();
    }

    // Second session: everything is back.
    {
        let engine = persistent_engine(dir.path());
        let schema = engine.execute("schema").unwrap().render();
        assert!(schema.contains("node Person"));
        assert!(schema.contains("edge Knows(Person -> Person)"));

        let result = engine
            .query(
                "match (a:Person)-[x:Knows]->(b:Person) from g \
                 where x.since = 1999 return (a), a.name",
            )
            .unwrap();
        assert_eq!(result.rows.len(), 1);
        assert_eq!(
            result.rows[0].cells[1].value,
            CellValue::Text("ada".into())
        );

        // Schema checks still apply after restore.
        let err = engine.execute("insert N(3, \"Ghost\")").unwrap_err();
        assert!(format!("{err}").contains("schema violation"));

        // So does id uniqueness.
        let err = engine.execute("insert N(10, \"Person\")").unwrap_err();
        assert!(format!("{err}").contains("duplicate identity"));
    }
}

#[test]
fn views_and_derived_ids_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    let before;
    // First session: build the graph, register a construction view, and
    // record the derived edge ids.
    {
        let engine = persistent_engine(dir.path());
        engine
            .execute_script(
                "create node Person; create node Doc; create node Subject; \
                 create edge Authored(Person -> Doc); \
                 create edge Tagged(Doc -> Subject); \
                 insert N(1, \"Person\"); insert N(2, \"Person\"); \
                 insert N(3, \"Doc\"); insert N(4, \"Doc\"); \
                 insert N(5, \"Subject\"); \
                 insert E(10, 1, 3, \"Authored\"); \
                 insert E(11, 2, 4, \"Authored\"); \
                 insert E(13, 3, 5, \"Tagged\"); \
                 insert E(14, 4, 5, \"Tagged\");",
            )
            .unwrap();
        engine
            .create_view(
                "create view expertise on g ( \
                   match (p:Person)-[a:Authored]->(d:Doc)-[t:Tagged]->(s:Subject) \
                   construct (p)-[x:ExpertIn]->(s) \
                   set x = SK(\"expert\", p, s) )",
            )
            .unwrap();
        let result = engine
            .query("match (p:Person)-[x:ExpertIn]->(s:Subject) from expertise return (x)")
            .unwrap();
        before = edge_ids(&result);
        assert_eq!(before.len(), 2);
    }

    // Second session: the view definition was re-parsed from its stored
    // text and derives the same ids.
    {
        let engine = persistent_engine(dir.path());
        let views = engine.execute("views").unwrap().render();
        assert!(views.starts_with("expertise: "));

        let result = engine
            .query("match (p:Person)-[x:ExpertIn]->(s:Subject) from expertise return (x)")
            .unwrap();
        assert_eq!(edge_ids(&result), before);
    }
}

#[test]
fn catalog_and_selection_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    // First session: a second instance with its own schema, left current.
    {
        let engine = persistent_engine(dir.path());
        engine.execute("create graph q1").unwrap();
        engine.execute("use q1").unwrap();
        engine.execute("create node Item").unwrap();
        engine.execute("insert N(1, \"Item\")").unwrap();
    }

    // Second session: same instances, same selection, isolated state.
    {
        let engine = persistent_engine(dir.path());
        assert_eq!(engine.info().current, "q1");
        assert_eq!(engine.info().graphs, 2);
        assert_eq!(engine.info().nodes, 1);

        engine.execute("use default").unwrap();
        assert_eq!(engine.info().nodes, 0);
    }
}

#[test]
fn dropped_graphs_stay_dropped() {
    let dir = tempfile::TempDir::new().unwrap();

    {
        let engine = persistent_engine(dir.path());
        engine.execute("create graph scratch").unwrap();
        engine.execute("drop graph scratch").unwrap();
    }

    {
        let engine = persistent_engine(dir.path());
        assert_eq!(engine.info().graphs, 1);
        let err = engine.execute("use scratch").unwrap_err();
        assert!(format!("{err}").contains("graph not found"));
    }
}
