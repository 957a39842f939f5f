use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::analysis::{Analysis, CandidateKind, LineCol};
use crate::config::Config;
use crate::formatter::ExternalFormatter;
use crate::parser::TextRange;

pub struct ManylebLanguageServer {
    client: Client,
    // One immutable analysis per open document, replaced wholesale on every
    // change. Requests clone the Arc and drop the lock before querying.
    documents: Arc<RwLock<HashMap<String, Arc<Analysis>>>>,
    config: Arc<RwLock<Config>>,
}

impl ManylebLanguageServer {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(RwLock::new(Config::default())),
        }
    }

    /// Convert URI to file system path
    fn uri_to_file_path(uri: &Uri) -> Option<PathBuf> {
        uri.to_file_path().ok()
    }

    async fn snapshot(&self, uri: &Uri) -> Option<Arc<Analysis>> {
        let docs = self.documents.read().await;
        docs.get(&uri.to_string()).cloned()
    }

    async fn store(&self, uri: &Uri, text: String, version: i32) {
        let mut docs = self.documents.write().await;
        if let Some(existing) = docs.get(&uri.to_string()) {
            if existing.version() > version {
                tracing::debug!(%version, current = existing.version(), "ignoring stale document version");
                return;
            }
        }
        docs.insert(uri.to_string(), Arc::new(Analysis::new(text, version)));
    }

    fn to_lsp_position(pos: LineCol) -> Position {
        Position {
            line: pos.line,
            character: pos.character,
        }
    }

    fn to_lsp_range(analysis: &Analysis, range: TextRange) -> Range {
        Range {
            start: Self::to_lsp_position(analysis.position_at(range.start)),
            end: Self::to_lsp_position(analysis.position_at(range.end)),
        }
    }

    fn to_offset(analysis: &Analysis, position: Position) -> usize {
        analysis.offset_at(LineCol::new(position.line, position.character))
    }

    fn completion_kind(kind: CandidateKind) -> CompletionItemKind {
        match kind {
            CandidateKind::Keyword => CompletionItemKind::KEYWORD,
            CandidateKind::Method => CompletionItemKind::METHOD,
            CandidateKind::Type => CompletionItemKind::TYPE_PARAMETER,
            CandidateKind::Object => CompletionItemKind::CLASS,
        }
    }

    /// Run the external formatter on the document's file. Failures are shown
    /// to the user and never abort the request.
    async fn run_formatter(&self, uri: &Uri) -> bool {
        let Some(path) = Self::uri_to_file_path(uri) else {
            self.client
                .show_message(
                    MessageType::ERROR,
                    format!("Cannot format {}: not a file on disk", uri.as_str()),
                )
                .await;
            return false;
        };

        let formatter = {
            let config = self.config.read().await;
            ExternalFormatter::new(&config.formatter)
        };

        match formatter.format_file(&path).await {
            Ok(()) => {
                self.client
                    .log_message(MessageType::LOG, format!("Formatted {}", path.display()))
                    .await;
                true
            }
            Err(err) => {
                tracing::warn!(error = %err, "formatting failed");
                self.client
                    .show_message(
                        MessageType::ERROR,
                        format!("Failed to format manyleb file: {}", err),
                    )
                    .await;
                false
            }
        }
    }
}

impl LanguageServer for ManylebLanguageServer {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        match Config::from_initialization_options(params.initialization_options) {
            Ok(config) => *self.config.write().await = config,
            Err(err) => {
                tracing::warn!(error = %err, "invalid initialization options, using defaults");
                self.client
                    .log_message(
                        MessageType::WARNING,
                        format!("Ignoring invalid manyleb settings: {}", err),
                    )
                    .await;
            }
        }

        Ok(InitializeResult {
            server_info: Some(ServerInfo {
                name: "manyleb-lsp".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Options(
                    TextDocumentSyncOptions {
                        open_close: Some(true),
                        change: Some(TextDocumentSyncKind::FULL),
                        will_save: None,
                        will_save_wait_until: None,
                        save: Some(TextDocumentSyncSaveOptions::Supported(true)),
                    },
                )),
                completion_provider: Some(CompletionOptions {
                    resolve_provider: Some(false),
                    trigger_characters: Some(vec![" ".to_string()]),
                    all_commit_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                    completion_item: None,
                }),
                definition_provider: Some(OneOf::Left(true)),
                rename_provider: Some(OneOf::Right(RenameOptions {
                    prepare_provider: Some(true),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                })),
                document_symbol_provider: Some(OneOf::Left(true)),
                document_formatting_provider: Some(OneOf::Left(true)),
                ..Default::default()
            },
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("client initialized");
        self.client
            .log_message(MessageType::INFO, "manyleb LSP server initialized!")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.client
            .log_message(
                MessageType::LOG,
                format!("Document opened: {} (version: {})", doc.uri.as_str(), doc.version),
            )
            .await;

        self.store(&doc.uri, doc.text, doc.version).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // Full sync: the last change carries the whole text
        if let Some(change) = params.content_changes.into_iter().last() {
            self.client
                .log_message(
                    MessageType::LOG,
                    format!("Document changed: {} (version: {})", uri.as_str(), version),
                )
                .await;
            self.store(&uri, change.text, version).await;
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let format_on_save = self.config.read().await.format_on_save;
        if format_on_save {
            self.run_formatter(&params.text_document.uri).await;
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        {
            let mut docs = self.documents.write().await;
            docs.remove(&params.text_document.uri.to_string());
        }

        self.client
            .log_message(
                MessageType::LOG,
                format!("File closed: {}", params.text_document.uri.as_str()),
            )
            .await;
    }

    async fn goto_definition(&self, params: GotoDefinitionParams) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;

        let Some(analysis) = self.snapshot(&uri).await else {
            return Ok(None);
        };

        let offset = Self::to_offset(&analysis, position);
        let Some(entry) = analysis.definition_at(offset) else {
            return Ok(None);
        };

        self.client
            .log_message(
                MessageType::LOG,
                format!("Found definition for '{}'", entry.name),
            )
            .await;

        let range = Self::to_lsp_range(&analysis, entry.range);
        Ok(Some(GotoDefinitionResponse::Scalar(Location { uri, range })))
    }

    async fn prepare_rename(&self, params: TextDocumentPositionParams) -> Result<Option<PrepareRenameResponse>> {
        let Some(analysis) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };

        let offset = Self::to_offset(&analysis, params.position);
        Ok(analysis.prepare_rename(offset).map(|token| {
            PrepareRenameResponse::RangeWithPlaceholder {
                range: Self::to_lsp_range(&analysis, token.range()),
                placeholder: token.text.to_string(),
            }
        }))
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let new_name = params.new_name;

        let Some(analysis) = self.snapshot(&uri).await else {
            return Ok(None);
        };

        let offset = Self::to_offset(&analysis, position);
        let edits = match analysis.rename_at(offset, &new_name) {
            Ok(Some(edits)) => edits,
            Ok(None) => return Ok(None),
            Err(err) => return Err(Error::invalid_params(err.to_string())),
        };

        if edits.is_empty() {
            self.client
                .log_message(MessageType::LOG, "Rename found no occurrences")
                .await;
            return Ok(None);
        }

        self.client
            .log_message(
                MessageType::LOG,
                format!("Renaming {} occurrences to '{}'", edits.len(), new_name),
            )
            .await;

        let text_edits: Vec<TextEdit> = edits
            .iter()
            .map(|edit| TextEdit {
                range: Self::to_lsp_range(&analysis, edit.range),
                new_text: edit.replacement.clone(),
            })
            .collect();

        let mut changes = HashMap::new();
        changes.insert(uri, text_edits);

        Ok(Some(WorkspaceEdit {
            changes: Some(changes),
            document_changes: None,
            change_annotations: None,
        }))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let Some(analysis) = self.snapshot(&uri).await else {
            return Ok(None);
        };

        let offset = Self::to_offset(&analysis, position);
        let items: Vec<CompletionItem> = analysis
            .completions_at(offset)
            .into_iter()
            .map(|candidate| CompletionItem {
                label: candidate.label,
                kind: Some(Self::completion_kind(candidate.kind)),
                detail: Some(candidate.detail),
                ..Default::default()
            })
            .collect();

        Ok(Some(CompletionResponse::Array(items)))
    }

    async fn document_symbol(&self, params: DocumentSymbolParams) -> Result<Option<DocumentSymbolResponse>> {
        let Some(analysis) = self.snapshot(&params.text_document.uri).await else {
            return Ok(None);
        };

        let document_symbols: Vec<DocumentSymbol> = analysis
            .symbols()
            .iter()
            .map(|entry| {
                #[allow(deprecated)]
                DocumentSymbol {
                    name: entry.name.clone(),
                    detail: Some("object".to_string()),
                    kind: SymbolKind::CLASS,
                    tags: None,
                    deprecated: None,
                    range: Self::to_lsp_range(&analysis, entry.extent),
                    selection_range: Self::to_lsp_range(&analysis, entry.range),
                    children: None,
                }
            })
            .collect();

        if document_symbols.is_empty() {
            Ok(None)
        } else {
            Ok(Some(DocumentSymbolResponse::Nested(document_symbols)))
        }
    }

    async fn formatting(&self, params: DocumentFormattingParams) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;

        self.client
            .log_message(MessageType::LOG, format!("Formatting request for {}", uri.as_str()))
            .await;

        // The tool rewrites the file on disk; there are no in-memory edits.
        if self.run_formatter(&uri).await {
            Ok(Some(Vec::new()))
        } else {
            Ok(None)
        }
    }
}

pub async fn run_server() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(ManylebLanguageServer::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
