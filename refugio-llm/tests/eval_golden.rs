//! Prompt Quality Evaluation — Golden Test Set.
//!
//! Curated prompt renderings and raw model outputs that every template and
//! parser change must keep handling.
//!
//! ## Usage
//!
//! - **Offline eval:** `cargo test -p refugio-llm --test eval_golden` checks
//!   template rendering and output post-processing.
//! - **Online eval (requires Ollama):** set `REFUGIO_EVAL_LLM=1` to call the
//!   configured local model and check its answer is splittable.

use refugio_llm::narrative::{ending_image_prompt, parse_extracted_items, split_narrative};
use refugio_llm::prompt;

/// A golden prompt rendering.
struct GoldenCase {
    /// Human-readable name for the test case.
    name: &'static str,
    /// The rendered prompt.
    rendered: String,
    /// Strings that MUST appear in the rendered prompt.
    prompt_must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered prompt.
    prompt_must_not_contain: Vec<&'static str>,
}

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. Opening scene
        // ---------------------------------------------------------------
        GoldenCase {
            name: "initial_story",
            rendered: prompt::initial_story(),
            prompt_must_contain: vec!["apocalipsis zombie", "IMAGEN:", "2 párrafos"],
            prompt_must_not_contain: vec!["{", "TODO"],
        },
        // ---------------------------------------------------------------
        // 2. Continuation, empty inventory
        // ---------------------------------------------------------------
        GoldenCase {
            name: "continue_no_inventory",
            rendered: prompt::continue_story(
                "assistant: Despiertas en un hospital.\nuser: Busco una salida",
                "Abro la puerta del fondo",
                "",
            ),
            prompt_must_contain: vec![
                "Despiertas en un hospital",
                "\"Abro la puerta del fondo\"",
                "SOBRE LOS FINALES",
            ],
            prompt_must_not_contain: vec!["Inventario actual", "{history}", "{player_input}"],
        },
        // ---------------------------------------------------------------
        // 3. Continuation with inventory
        // ---------------------------------------------------------------
        GoldenCase {
            name: "continue_with_inventory",
            rendered: prompt::continue_story(
                "assistant: Un zombie bloquea el pasillo.",
                "Le golpeo con el bate",
                "Bate (x1), Vendas (x2)",
            ),
            prompt_must_contain: vec!["Bate (x1), Vendas (x2)", "Ten en cuenta el inventario"],
            prompt_must_not_contain: vec!["{inventory", "{inventory_rules}"],
        },
        // ---------------------------------------------------------------
        // 4. Player text with braces
        // ---------------------------------------------------------------
        GoldenCase {
            name: "continue_player_braces",
            rendered: prompt::continue_story("assistant: Nada.", "Escribo {history} en la pared", ""),
            prompt_must_contain: vec!["Escribo {history} en la pared"],
            prompt_must_not_contain: vec![],
        },
        // ---------------------------------------------------------------
        // 5. Ending epilogue
        // ---------------------------------------------------------------
        GoldenCase {
            name: "ending_escape",
            rendered: prompt::ending_scene(
                "escape",
                "Escape Exitoso",
                "Turnos jugados: 8\nAcciones de exploración: 6",
            ),
            prompt_must_contain: vec!["\"Escape Exitoso\"", "tipo: escape", "Turnos jugados: 8"],
            prompt_must_not_contain: vec!["{ending_title}", "{statistics}"],
        },
        // ---------------------------------------------------------------
        // 6. Item extraction, nothing owned
        // ---------------------------------------------------------------
        GoldenCase {
            name: "extraction_empty_inventory",
            rendered: prompt::item_extraction("Sobre la mesa hay una linterna.", &[]),
            prompt_must_contain: vec!["una linterna", "ninguno", "JSON", "{\"items\""],
            prompt_must_not_contain: vec!["{{", "{owned}"],
        },
        // ---------------------------------------------------------------
        // 7. Item extraction, owned items listed
        // ---------------------------------------------------------------
        GoldenCase {
            name: "extraction_owned",
            rendered: prompt::item_extraction(
                "Ves otra linterna y una cuerda.",
                &["linterna".to_string(), "vendas".to_string()],
            ),
            prompt_must_contain: vec!["YA tiene: linterna, vendas"],
            prompt_must_not_contain: vec!["ninguno"],
        },
        // ---------------------------------------------------------------
        // 8. Image wrapper
        // ---------------------------------------------------------------
        GoldenCase {
            name: "image_wrapper",
            rendered: prompt::image_generation("abandoned pharmacy at night"),
            prompt_must_contain: vec!["abandoned pharmacy at night", "16:9", "pixel art"],
            prompt_must_not_contain: vec!["{description}"],
        },
    ]
}

// ---------------------------------------------------------------------------
// Offline Tests — Template Rendering Validation
// ---------------------------------------------------------------------------

#[test]
fn golden_prompts_render_without_unresolved_vars() {
    for case in &golden_cases() {
        let rendered = &case.rendered;

        for needle in &case.prompt_must_contain {
            assert!(
                rendered.contains(needle),
                "Golden case '{}': rendered prompt must contain '{}' but doesn't.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }

        for needle in &case.prompt_must_not_contain {
            assert!(
                !rendered.contains(needle),
                "Golden case '{}': rendered prompt must NOT contain '{}' but does.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }
    }
}

#[test]
fn story_prompts_demand_image_line() {
    for (name, template) in [
        ("initial", prompt::INITIAL_STORY),
        ("continue", prompt::CONTINUE_STORY),
        ("ending", prompt::ENDING_SCENE),
    ] {
        assert!(
            template.contains("\"IMAGEN:\""),
            "Story prompt '{name}' must ask for the IMAGEN: line"
        );
    }
}

// ---------------------------------------------------------------------------
// Offline Tests — Output Post-Processing
// ---------------------------------------------------------------------------

/// Raw answers in the shapes local models actually produce.
const RAW_STORIES: &[(&str, &str, &str)] = &[
    (
        "Las luces del supermercado parpadean. Un gemido llega desde el almacén.\n¿Qué decides hacer?\n\nIMAGEN: flickering supermarket aisle, zombie shadow, pixel art",
        "¿Qué decides hacer?",
        "flickering supermarket aisle, zombie shadow, pixel art",
    ),
    (
        "Subes a la azotea sin aliento. ¿Hacia dónde te diriges?",
        "¿Hacia dónde te diriges?",
        "zombie apocalypse scene",
    ),
    (
        "El portal cede.\nIMAGEN: broken door IMAGEN: duplicated line",
        "El portal cede.",
        "broken door",
    ),
];

#[test]
fn golden_stories_split_cleanly() {
    for (raw, narrative_ends_with, image) in RAW_STORIES {
        let story = split_narrative(raw, "IMAGEN: ", "zombie apocalypse scene");
        assert!(story.narrative.ends_with(narrative_ends_with), "narrative: {}", story.narrative);
        assert!(!story.narrative.contains("IMAGEN"));
        assert_eq!(story.image_prompt, *image);
    }
}

#[test]
fn ending_without_image_gets_typed_default() {
    let default = ending_image_prompt("sacrifice");
    let story = split_narrative("Cierras la puerta tras de ti.", "IMAGEN: ", &default);
    assert_eq!(story.image_prompt, "sacrifice ending zombie apocalypse pixel art");
}

#[test]
fn golden_extractions_parse() {
    let raw = r#"```json
{"items": [
  {"name": "Barra de metal", "description": "Pesada y oxidada", "type": "weapon", "icon": "🔩", "usable": true},
  {"name": "Latas de comida", "description": "Judías en conserva", "type": "food", "icon": "🥫", "usable": true}
]}
```"#;
    let items = parse_extracted_items(raw).expect("parse");
    let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["Barra de metal", "Latas de comida"]);
    assert_eq!(items[1].item_type, "food");
}

// ---------------------------------------------------------------------------
// Online Test — opt-in, needs a running Ollama
// ---------------------------------------------------------------------------

#[tokio::test]
async fn online_opening_is_splittable() {
    if std::env::var("REFUGIO_EVAL_LLM").is_err() {
        return;
    }
    let client = refugio_llm::LlmClient::new(
        refugio_llm::LlmProvider::Ollama {
            base_url: "http://localhost:11434".into(),
        },
        "mistral:7b-instruct",
        "qwen2.5:1.5b",
        1,
    );
    let response = client
        .generate(&refugio_llm::LlmRequest::story(prompt::initial_story()))
        .await
        .expect("Ollama reachable");
    let story = split_narrative(&response.text, "IMAGEN: ", "zombie apocalypse scene");
    assert!(!story.narrative.is_empty());
}
