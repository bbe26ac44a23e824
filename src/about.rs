use crate::PROGRAM_TITLE;

pub fn about() -> Vec<String> {
    vec![
        format!("{} v{}", PROGRAM_TITLE, env!("CARGO_PKG_VERSION")),
        "Maps one sACN channel to LedFx scenes.".to_string(),
    ]
}
