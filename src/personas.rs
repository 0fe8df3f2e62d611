//! Loading the persona collection.

use std::collections::HashSet;
use std::path::{Component, Path};

use menuprobe_core_types::{assign_default_ids, Persona};
use tokio::fs;
use tracing::{info, warn};

use crate::errors::{ProbeError, ProbeResult};

/// Read a JSON array of personas, filling missing ids by position and
/// dropping later duplicates and ids unusable as a directory name.
pub async fn load_personas(path: &Path) -> ProbeResult<Vec<Persona>> {
    let raw = fs::read_to_string(path)
        .await
        .map_err(|err| ProbeError::io(path, err))?;
    let personas = parse_personas(&raw).map_err(|err| ProbeError::json(path, err))?;
    info!(path = %path.display(), count = personas.len(), "personas loaded");
    Ok(personas)
}

pub fn parse_personas(raw: &str) -> Result<Vec<Persona>, serde_json::Error> {
    let mut personas: Vec<Persona> = serde_json::from_str(raw)?;
    assign_default_ids(&mut personas);

    let mut seen = HashSet::new();
    personas.retain(|persona| {
        if !is_plain_dir_name(&persona.id) {
            warn!(persona = %persona.id, "persona id is not a plain directory name, ignored");
            return false;
        }
        let fresh = seen.insert(persona.id.clone());
        if !fresh {
            warn!(persona = %persona.id, "duplicate persona id ignored");
        }
        fresh
    });
    Ok(personas)
}

/// Report directories are named after persona ids and must stay inside the
/// output directory.
fn is_plain_dir_name(id: &str) -> bool {
    if id.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(id).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(name)), None) if name == id
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_ids_and_ignores_unknown_fields() {
        let personas = parse_personas(
            r#"[
                {"id":"D-01","condition":"diet","diet":"vegan","goal":"Order ramen (Pickup, under $12)","favourite_colour":"red"},
                {"age":61,"accessibility":"low_vision"},
                {"id":"D-01","age":30}
            ]"#,
        )
        .unwrap();
        assert_eq!(personas.len(), 2);
        assert_eq!(personas[0].condition.as_deref(), Some("diet"));
        assert_eq!(personas[1].id, "P-02");
        assert!(personas[1].has_accessibility_need());
    }

    #[test]
    fn drops_ids_that_escape_the_output_dir() {
        let personas = parse_personas(
            r#"[
                {"id":"../x"},
                {"id":".."},
                {"id":"a/b"},
                {"id":"a\\b"},
                {"id":"."},
                {"id":"U-07"}
            ]"#,
        )
        .unwrap();
        let ids: Vec<&str> = personas.iter().map(|persona| persona.id.as_str()).collect();
        assert_eq!(ids, vec!["U-07"]);
    }

    #[test]
    fn rejects_non_array_input() {
        assert!(parse_personas(r#"{"id":"D-01"}"#).is_err());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("personas.json");
        std::fs::write(&path, r#"[{"id":"U-01"}]"#).unwrap();
        let personas = tokio_test::block_on(load_personas(&path)).unwrap();
        assert_eq!(personas[0].id, "U-01");
    }
}
