//! Prompt templates for Refugio narration.
//!
//! Templates use `{key}` placeholders filled by [`render_template`]. The
//! story prompts are in Spanish and ask the model to end with a line that
//! starts with `IMAGEN:` followed by an English scene description; see
//! [`crate::narrative::split_narrative`].

/// Opening scene.
pub const INITIAL_STORY: &str = r#"Eres el narrador de una aventura conversacional de supervivencia zombie con estética pixel art.

Escribe la escena inicial: el jugador se encuentra en los primeros momentos del apocalipsis zombie.
Describe la situación de forma inmersiva y dramática en COMO MÁXIMO 2 párrafos cortos.

IMPORTANTE: si en la escena hay objetos útiles para sobrevivir (armas, comida, medicinas, herramientas, llaves...),
menciónalos con naturalidad. Por ejemplo: "Ves una barra de metal en el suelo".

Sé conciso. Termina SIEMPRE preguntando al jugador qué hace, adónde va o cómo reacciona
("¿Qué decides hacer?", "¿Hacia dónde te diriges?").

IMPORTANTE: al final incluye SIEMPRE una línea aparte que empiece EXACTAMENTE por "IMAGEN:" seguida de una
descripción breve en inglés para generar una imagen pixel art de la escena (máximo 50 palabras). Esta línea es OBLIGATORIA."#;

/// Continuation after a player action.
pub const CONTINUE_STORY: &str = r#"Eres el narrador de una aventura conversacional de supervivencia zombie con estética pixel art.

Historia de la conversación:
{history}
{inventory_block}
El jugador acaba de decir: "{player_input}"

Continúa la historia a partir de la acción del jugador. Describe las consecuencias de forma dramática e
inmersiva en COMO MÁXIMO 2 párrafos cortos.
{inventory_rules}
IMPORTANTE: si en la nueva escena hay objetos útiles para sobrevivir, menciónalos con naturalidad.

Sé conciso. Termina SIEMPRE preguntando al jugador qué hace, qué examina o adónde va.

IMPORTANTE: al final incluye SIEMPRE una línea aparte que empiece EXACTAMENTE por "IMAGEN:" seguida de una
descripción breve en inglés para generar una imagen pixel art de la escena (máximo 50 palabras). Esta línea es OBLIGATORIA.

SOBRE LOS FINALES: si la situación es extremadamente peligrosa o el jugador toma una decisión fatal, puedes describir
con claridad su muerte, su infección, un escape logrado o cualquier otro final definitivo."#;

const INVENTORY_BLOCK: &str = "\nInventario actual del jugador: {inventory}\n";

const INVENTORY_RULES: &str = "\nTen en cuenta el inventario del jugador. Si intenta usar un objeto que tiene, describe el resultado. \
Si intenta recoger algo que ya tiene, indica que ya lo lleva.\n";

/// Epilogue for a reached ending.
pub const ENDING_SCENE: &str = r#"Eres el narrador de una aventura conversacional de supervivencia zombie con estética pixel art.

El jugador ha alcanzado el final "{ending_title}" (tipo: {ending_type}).

Estadísticas de la partida:
{statistics}

Escribe una narración ÉPICA y DRAMÁTICA de este final en COMO MÁXIMO 3 párrafos. Debe describir cómo se desarrolla
el final, aludir a las decisiones del jugador, cerrar la historia con emoción y encajar con el tipo de final.

IMPORTANTE: al final incluye SIEMPRE una línea aparte que empiece EXACTAMENTE por "IMAGEN:" seguida de una
descripción breve en inglés para generar una imagen pixel art de la escena final (máximo 50 palabras). Esta línea es OBLIGATORIA."#;

/// Item extraction; answered in JSON mode.
pub const ITEM_EXTRACTION: &str = r#"Analiza la siguiente narración de un juego de supervivencia zombie y extrae ÚNICAMENTE los objetos útiles
mencionados explícitamente que el jugador podría recoger.

Narración: "{narrative}"

Objetos que el jugador YA tiene: {owned}

REGLAS:
1. Solo objetos mencionados EXPLÍCITAMENTE en la narración.
2. NO incluyas objetos que el jugador ya tiene.
3. NO incluyas lugares, zombies ni personajes.
4. Solo objetos físicos que se puedan recoger.
5. Cada objeto lleva un emoji apropiado.
6. Si no hay objetos útiles, devuelve una lista vacía.

Tipos: weapon (armas), food (comida y bebida), medical (medicinas, vendas), tool (linterna, cuerda...),
key (llaves, tarjetas de acceso), misc (otros objetos útiles).

Responde SOLO con JSON:
{{"items": [{{"name": "...", "description": "...", "type": "weapon|food|medical|tool|key|misc", "icon": "emoji", "usable": true}}]}}"#;

/// Wrapper for the illustration backend.
pub const GENERATE_IMAGE: &str = "Generate a pixel art style image in 16:9 aspect ratio: {description}. \
Use 8-bit retro gaming aesthetics with a limited color palette, blocky pixelated style and clear definition. \
The image must be in landscape format (16:9 ratio).";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value, then turns the `{{` and
/// `}}` escapes into literal braces.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result.replace("{{", "{").replace("}}", "}")
}

/// `"role: content"` lines, oldest first.
#[must_use]
pub fn format_history<'a, I>(turns: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    turns
        .into_iter()
        .map(|(role, content)| format!("{role}: {content}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt for the opening scene.
#[must_use]
pub fn initial_story() -> String {
    render_template(INITIAL_STORY, &[])
}

/// Prompt for the next turn. The inventory paragraphs are omitted when
/// `inventory_summary` is empty.
#[must_use]
pub fn continue_story(history: &str, player_input: &str, inventory_summary: &str) -> String {
    let (block, rules) = if inventory_summary.trim().is_empty() {
        (String::new(), String::new())
    } else {
        (
            render_template(INVENTORY_BLOCK, &[("inventory", inventory_summary)]),
            INVENTORY_RULES.to_string(),
        )
    };
    // Player text is substituted last so it cannot inject placeholders.
    render_template(
        CONTINUE_STORY,
        &[
            ("history", history),
            ("inventory_block", &block),
            ("inventory_rules", &rules),
            ("player_input", player_input),
        ],
    )
}

/// Prompt for an ending epilogue.
#[must_use]
pub fn ending_scene(ending_type: &str, ending_title: &str, statistics: &str) -> String {
    render_template(
        ENDING_SCENE,
        &[
            ("ending_title", ending_title),
            ("ending_type", ending_type),
            ("statistics", statistics),
        ],
    )
}

/// Prompt for item extraction. `owned` are the lowercased names already in
/// the inventory.
#[must_use]
pub fn item_extraction(narrative: &str, owned: &[String]) -> String {
    let owned = if owned.is_empty() {
        "ninguno".to_string()
    } else {
        owned.join(", ")
    };
    render_template(ITEM_EXTRACTION, &[("owned", &owned), ("narrative", narrative)])
}

/// Prompt for the illustration backend.
#[must_use]
pub fn image_generation(description: &str) -> String {
    render_template(GENERATE_IMAGE, &[("description", description)])
}
