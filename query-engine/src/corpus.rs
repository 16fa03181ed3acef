use std::path::PathBuf;

use common::utils::config::AppConfig;

use crate::{
    engine::CorpusProfile,
    prompt::{PromptTemplate, BIBLE_SYSTEM_PROMPT, QURAN_SYSTEM_PROMPT},
};

/// The two corpus profiles differ only in wording and paths; the engine
/// logic behind them is identical.
pub fn bible_profile(config: &AppConfig) -> CorpusProfile {
    CorpusProfile {
        name: "bible",
        source_path: PathBuf::from(&config.bible_source_path),
        index_path: config.bible_index_path(),
        prompt: PromptTemplate {
            system: BIBLE_SYSTEM_PROMPT,
        },
    }
}

pub fn quran_profile(config: &AppConfig) -> CorpusProfile {
    CorpusProfile {
        name: "quran",
        source_path: PathBuf::from(&config.quran_source_path),
        index_path: config.quran_index_path(),
        prompt: PromptTemplate {
            system: QURAN_SYSTEM_PROMPT,
        },
    }
}
