#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Abort on malformed headers, metadata and CSV bodies instead of
    /// skipping them and recording a diagnostic.
    pub strict: bool,
    /// Use a leading `#manifest` block as a line index.
    pub use_manifest: bool,
    pub resolve_refs: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_manifest(mut self, use_manifest: bool) -> Self {
        self.use_manifest = use_manifest;
        self
    }

    pub fn with_resolve_refs(mut self, resolve_refs: bool) -> Self {
        self.resolve_refs = resolve_refs;
        self
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: true,
            use_manifest: true,
            resolve_refs: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SerializeOptions {
    /// Emit a leading `#manifest` block with recomputed `start_line` values.
    pub emit_manifest: bool,
}

impl SerializeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_manifest(mut self, emit_manifest: bool) -> Self {
        self.emit_manifest = emit_manifest;
        self
    }
}
