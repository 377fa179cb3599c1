use indexmap::IndexMap;

/// The two invocation shapes of RUN/CMD/ENTRYPOINT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandForm {
    Shell,
    Exec,
}

/// Value of a parsed `--key[=value]` option or instruction flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Str(String),
}

impl OptionValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            OptionValue::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Bool(_) => None,
            OptionValue::Str(s) => Some(s),
        }
    }
}

/// Parse a single `--key[=value]` string into a key/value pair.
///
/// `--k=true` and `--k=false` (case-insensitive) normalize to booleans;
/// a bare `--k` means `k -> true`.
pub fn parse_option(flag: &str) -> (String, OptionValue) {
    let flag = flag.strip_prefix("--").unwrap_or(flag);
    match flag.split_once('=') {
        Some((k, v)) if v.eq_ignore_ascii_case("true") => (k.to_string(), OptionValue::Bool(true)),
        Some((k, v)) if v.eq_ignore_ascii_case("false") => {
            (k.to_string(), OptionValue::Bool(false))
        }
        Some((k, v)) => (k.to_string(), OptionValue::Str(v.to_string())),
        None => (flag.to_string(), OptionValue::Bool(true)),
    }
}

/// Parse a list of raw `--key[=value]` strings into an ordered map.
pub fn parse_options(flags: &[String]) -> IndexMap<String, OptionValue> {
    flags.iter().map(|f| parse_option(f)).collect()
}

/// Split a shell string into whitespace-separated tokens, honoring single
/// and double quotes. Quote characters are stripped from the tokens.
pub(crate) fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut quote: Option<char> = None;

    for c in input.chars() {
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                } else {
                    current.push(c);
                }
            }
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    has_token = true;
                }
                c if c.is_whitespace() => {
                    if has_token {
                        tokens.push(std::mem::take(&mut current));
                        has_token = false;
                    }
                }
                c => {
                    current.push(c);
                    has_token = true;
                }
            },
        }
    }
    if has_token {
        tokens.push(current);
    }

    tokens
}

/// Split a shell string into its chain of commands and operators.
///
/// Returns an alternating list `[cmd, op, cmd, op, ..., cmd]` where the
/// operators are `&&`, `||`, `;`, `|` and `&`. Operators inside quotes are
/// left alone. A single command yields a single-element list; blank input
/// yields an empty one.
pub fn split_chained_commands(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    let mut chars = input.chars().peekable();
    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                current.push(c);
            }
            '&' | '|' if chars.peek() == Some(&c) => {
                chars.next();
                push_command(&mut parts, &mut current);
                // an operator with no command before it is dropped
                if parts.len() % 2 == 1 {
                    parts.push(format!("{c}{c}"));
                }
            }
            '&' | '|' | ';' => {
                push_command(&mut parts, &mut current);
                if parts.len() % 2 == 1 {
                    parts.push(c.to_string());
                }
            }
            c => current.push(c),
        }
    }
    push_command(&mut parts, &mut current);

    // a trailing operator with nothing after it is dropped
    if parts.len() % 2 == 0 {
        parts.pop();
    }
    parts
}

fn push_command(parts: &mut Vec<String>, current: &mut String) {
    let cmd = std::mem::take(current);
    let cmd = cmd.trim();
    if !cmd.is_empty() {
        parts.push(cmd.to_string());
    }
}

/// One command in a RUN layer's command chain.
///
/// This is a read-only view; all mutation goes through the owning
/// `Dockerfile`. The position fields are back-indices into the owning tree
/// and are kept consistent by realignment after every write.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    index: usize,
    line: usize,
    form: CommandForm,
    raw: String,
    tokens: Vec<String>,
    stage_index: usize,
    layer_index: usize,
}

impl ShellCommand {
    /// Build from a single shell-form command string (no chain operators).
    pub(crate) fn from_text(text: &str) -> Self {
        let raw = text.trim().to_string();
        let tokens = tokenize(&raw);
        Self {
            index: 0,
            line: 0,
            form: CommandForm::Shell,
            raw,
            tokens,
            stage_index: 0,
            layer_index: 0,
        }
    }

    /// Build from an exec-form token array.
    pub(crate) fn from_exec_tokens(tokens: Vec<String>) -> Self {
        let raw = tokens.join(" ");
        Self {
            index: 0,
            line: 0,
            form: CommandForm::Exec,
            raw,
            tokens,
            stage_index: 0,
            layer_index: 0,
        }
    }

    pub(crate) fn set_position(
        &mut self,
        stage_index: usize,
        layer_index: usize,
        index: usize,
        line: usize,
    ) {
        self.stage_index = stage_index;
        self.layer_index = layer_index;
        self.index = index;
        self.line = line;
    }

    /// Position of this command inside its RUN layer's chain.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Line in the Dockerfile this command resides on.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn form(&self) -> CommandForm {
        self.form
    }

    /// Index of the owning stage in the Dockerfile.
    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    /// Index of the owning RUN layer within its stage.
    pub fn layer_index(&self) -> usize {
        self.layer_index
    }

    /// The complete command as a string.
    pub fn text(&self) -> &str {
        &self.raw
    }

    /// The program invoked, ie the first word of the command.
    pub fn program(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }

    /// Arguments passed to the program, options excluded.
    ///
    /// eg- "npm --foo=bar run test --production" -> ["run", "test"]
    pub fn args(&self) -> Vec<&str> {
        self.tokens
            .iter()
            .skip(1)
            .filter(|t| !t.starts_with("--"))
            .map(String::as_str)
            .collect()
    }

    /// The subcommand invoked, ie the first non-option argument.
    pub fn subcommand(&self) -> &str {
        self.args().first().copied().unwrap_or("")
    }

    /// All `--key[=value]` options specified in this command.
    pub fn options(&self) -> IndexMap<String, OptionValue> {
        self.tokens
            .iter()
            .skip(1)
            .filter(|t| t.starts_with("--"))
            .map(|t| parse_option(t))
            .collect()
    }
}
