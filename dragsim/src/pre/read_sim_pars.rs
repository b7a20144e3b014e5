use crate::core::session::GamePars;
use anyhow::Context;
use std::fs::OpenOptions;
use std::path::Path;

/// read_game_pars reads the JSON file and decodes the JSON string into the game parameters
/// struct. Sections and fields missing in the file keep their default values.
pub fn read_game_pars(filepath: &Path) -> anyhow::Result<GamePars> {
    let fh = OpenOptions::new()
        .read(true)
        .open(filepath)
        .context(format!(
            "Failed to open parameter file {}!",
            filepath.display()
        ))?;
    let pars: GamePars = serde_json::from_reader(&fh).context(format!(
        "Failed to parse parameter file {}!",
        filepath.display()
    ))?;
    Ok(pars)
}

/// load_game_pars returns the parameters from the given file or the built-in defaults, validated
/// in both cases.
pub fn load_game_pars(filepath: Option<&Path>) -> anyhow::Result<GamePars> {
    let pars = match filepath {
        Some(path) => read_game_pars(path)?,
        None => GamePars::default(),
    };
    pars.validate().context("Game parameters are invalid!")?;
    Ok(pars)
}
