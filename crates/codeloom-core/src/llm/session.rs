use crate::cache::ResponseCache;
use crate::config::{SelectionSettings, Settings};
use crate::context::{
    ConversationHistory, FileSelector, RequestBuilder, SelectionLimits, SelectionResult,
};
use crate::error::Result;
use crate::llm::traits::{GenerationRequest, GenerationTransport};
use crate::project::ProjectFile;
use crate::stream::{decode_events, AssembledResponse, EventStream, ResponseAssembler, StreamProgress};

/// A request ready to send, together with the selection that produced it.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub request: GenerationRequest,
    pub selection: SelectionResult,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub response: AssembledResponse,
    pub selection: SelectionResult,
    /// Served from the response cache without a network call.
    pub cached: bool,
}

/// Select → build → send → decode → assemble, for one project turn.
pub struct GenerationSession {
    transport: Box<dyn GenerationTransport>,
    selector: FileSelector,
    settings: SelectionSettings,
    limits: SelectionLimits,
    system_prompt: Option<String>,
}

impl GenerationSession {
    pub fn new(transport: Box<dyn GenerationTransport>, settings: &Settings) -> Result<Self> {
        Ok(Self {
            transport,
            selector: FileSelector::from_settings(&settings.selection),
            settings: settings.selection.clone(),
            limits: settings.selection_limits()?,
            system_prompt: None,
        })
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_limits(mut self, limits: SelectionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn selector(&self) -> &FileSelector {
        &self.selector
    }

    pub fn prepare(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
    ) -> PreparedRequest {
        let selection = self
            .selector
            .select_with_stats(files, prompt, history, self.limits);

        let mut builder = RequestBuilder::from_settings(&self.settings)
            .with_prompt(prompt)
            .with_history(history)
            .add_files(&selection.files);
        if let Some(ref system_prompt) = self.system_prompt {
            builder = builder.with_system_prompt(system_prompt.clone());
        }

        PreparedRequest {
            request: builder.build(),
            selection,
        }
    }

    /// Open the call and return the decoded event stream. Dropping the
    /// stream releases the connection.
    pub async fn stream(&self, request: &GenerationRequest) -> Result<EventStream> {
        let body = self.transport.open_stream(request).await?;
        Ok(decode_events(body))
    }

    pub async fn generate(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
        cache: Option<&mut ResponseCache>,
    ) -> Result<GenerationOutcome> {
        self.run(files, prompt, history, cache, ResponseAssembler::new())
            .await
    }

    pub async fn generate_with_progress(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
        cache: Option<&mut ResponseCache>,
        on_progress: impl FnMut(&StreamProgress) + Send + 'static,
    ) -> Result<GenerationOutcome> {
        let assembler = ResponseAssembler::new().with_progress(on_progress);
        self.run(files, prompt, history, cache, assembler).await
    }

    async fn run(
        &self,
        files: &[ProjectFile],
        prompt: &str,
        history: &ConversationHistory,
        mut cache: Option<&mut ResponseCache>,
        assembler: ResponseAssembler,
    ) -> Result<GenerationOutcome> {
        let PreparedRequest { request, selection } = self.prepare(files, prompt, history);

        let key = ResponseCache::key_for(&request);
        if let Some(response) = cache.as_deref_mut().and_then(|c| c.get(&key)) {
            tracing::debug!(key = %key, "Serving generation from cache");
            return Ok(GenerationOutcome {
                response,
                selection,
                cached: true,
            });
        }

        let events = self.stream(&request).await?;
        let response = assembler.assemble(events).await?;

        if let Some(cache) = cache {
            cache.insert(key, response.clone());
        }

        Ok(GenerationOutcome {
            response,
            selection,
            cached: false,
        })
    }
}
