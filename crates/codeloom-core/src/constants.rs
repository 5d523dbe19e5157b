/// Codeloom — centralized constants.
/// Scoring weights, selection limits and wire details live here.
/// Never hardcode these values elsewhere.

// ─── Relevance Scoring ────────────────────────────────────────────────────────

pub mod scoring {
    /// Flat bonus for conventionally important project files.
    pub const CORE_FILE: u32 = 100;

    /// Score for files touched by the most recent assistant turn.
    pub const RECENT_EDIT_BASE: u32 = 80;
    /// Decrease per assistant turn further back in history.
    pub const RECENT_EDIT_STEP: u32 = 10;

    /// Prompt mentions the file's base name.
    pub const PROMPT_FILE_NAME: u32 = 70;
    /// Prompt mentions one of the path's segments.
    pub const PROMPT_PATH_SEGMENT: u32 = 50;
    /// Path segments this short are too generic to match (`src`, `lib`, ...).
    pub const MIN_SEGMENT_LEN: usize = 3;

    /// File imports something that was just edited.
    pub const IMPORTS_RECENT: u32 = 40;
    /// File is imported by a high-priority file.
    pub const IMPORTED_BY_PRIORITY: u32 = 30;

    /// Files at or above this score pull in their own imports.
    pub const HIGH_PRIORITY: u32 = 70;
    /// Files at or above this score bypass the token budget.
    pub const MUST_INCLUDE: u32 = 90;

    /// Default allowlist: entry points, global styles, root component, build config.
    pub const CORE_FILES: &[&str] = &[
        "src/App.tsx",
        "src/main.tsx",
        "src/index.tsx",
        "src/index.css",
        "src/styles.css",
        "package.json",
        "vite.config.ts",
    ];
}

// ─── Selection ────────────────────────────────────────────────────────────────

pub mod selection {
    pub const DEFAULT_MAX_FILES: usize = 15;
    /// Safe estimated-token budget for file context.
    pub const DEFAULT_MAX_TOKENS: usize = 500_000;
    /// Always send at least this many files, even over budget.
    pub const MIN_CONTEXT_FILES: usize = 3;
    /// Hard per-file character ceiling applied when building the request.
    pub const MAX_FILE_CHARS: usize = 50_000;
    /// Assistant turns inspected by the recency pass.
    pub const RECENT_MESSAGES: usize = 5;
    /// Conversation messages forwarded with each request.
    pub const HISTORY_MESSAGES: usize = 10;
    /// `token_limit_reached` fires at this share of the budget, in percent.
    pub const LIMIT_WARNING_PERCENT: usize = 90;
}

// ─── Token Estimation ─────────────────────────────────────────────────────────

pub mod tokens {
    pub const CHARS_PER_TOKEN: f64 = 3.5;
    pub const CODE_DENSITY_FACTOR: f64 = 1.2;
    /// Presence of any of these marks text as code.
    pub const CODE_CHARS: &[char] = &[
        '{', '}', '[', ']', '(', ')', ';', ',', '.', '<', '>', '/', '\\',
    ];
}

// ─── Import Resolution ────────────────────────────────────────────────────────

pub mod imports {
    /// Alias for the project source root.
    pub const ROOT_ALIAS: &str = "@/";
    pub const SOURCE_ROOT: &str = "src";
    pub const DEFAULT_EXTENSION: &str = ".tsx";
    /// Probed in order when imports are validated against the snapshot.
    pub const PROBE_SUFFIXES: &[&str] = &[".tsx", ".ts", ".jsx", ".js", "/index.tsx", "/index.ts"];
}

// ─── Streaming ────────────────────────────────────────────────────────────────

pub mod stream {
    pub const FRAME_DELIMITER: &[u8] = b"\n\n";
    pub const DATA_PREFIX: &str = "data: ";
}

// ─── Response Cache ───────────────────────────────────────────────────────────

pub mod cache {
    pub const CAPACITY: usize = 50;
    pub const TTL_SECS: u64 = 300;
}

// ─── Endpoint ─────────────────────────────────────────────────────────────────

pub mod endpoints {
    pub const BASE_URL: &str = "http://localhost:54321/functions/v1";
    pub const GENERATE_PATH: &str = "/generate";
    pub const API_KEY_ENV: &str = "CODELOOM_API_KEY";
}
