use crate::phrase::PhraseProcessor;
use crate::providers::Provider;

pub struct ServerState<P: Provider> {
    pub processor: PhraseProcessor<P>,
}
