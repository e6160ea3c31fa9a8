//! Translation of several independent models in parallel.

use crate::config::SessionConfig;
use crate::error::TranslateResult;
use crate::ir::IrModel;
use crate::session::TranslateSession;
use crate::source::SourceGraph;
use crate::translator::TranslatorRegistry;
use rayon::prelude::*;
use tracing::info;

/// Translates every model on the rayon pool, one session per model, and
/// returns the outcomes in input order. Body caches are never shared between models.
pub fn translate_all(
    models: &[SourceGraph],
    registry: &TranslatorRegistry,
    config: &SessionConfig,
) -> Vec<TranslateResult<IrModel>> {
    info!(models = models.len(), "translating batch");
    models
        .par_iter()
        .enumerate()
        .map(|(index, model)| {
            let mut config = config.clone();
            config.model_name = match &model.name {
                Some(name) => name.clone(),
                None if models.len() > 1 => format!("{}_{}", config.model_name, index),
                None => config.model_name,
            };
            TranslateSession::new(model, registry, config).into_converted_model()
        })
        .collect()
}
