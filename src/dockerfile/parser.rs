use super::Error;
use super::shell::tokenize;

/// The fixed Dockerfile instruction set.
pub const INSTRUCTION_SET: &[&str] = &[
    "ADD",
    "ARG",
    "CMD",
    "COPY",
    "ENTRYPOINT",
    "ENV",
    "EXPOSE",
    "FROM",
    "HEALTHCHECK",
    "LABEL",
    "MAINTAINER",
    "ONBUILD",
    "RUN",
    "SHELL",
    "STOPSIGNAL",
    "USER",
    "VOLUME",
    "WORKDIR",
];

pub fn is_known_instruction(cmd: &str) -> bool {
    INSTRUCTION_SET.contains(&cmd)
}

/// A single parsed Dockerfile instruction.
///
/// `value` semantics depend on the command: ENV and LABEL flatten their
/// pairs to `[k, v, k, v, ...]`; shell-form RUN/CMD/ENTRYPOINT hold the
/// raw command tail as a single element; exec form holds the array
/// elements with `json` set; everything else holds whitespace tokens.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub cmd: String,
    pub original: String,
    pub value: Vec<String>,
    pub flags: Vec<String>,
    pub json: bool,
    pub start_line: usize,
    pub end_line: usize,
}

/// Parse Dockerfile text into an ordered instruction list.
///
/// Comments and parser directives are skipped, including inside line
/// continuations. Continuations are collapsed, so `original` is always a
/// single line.
pub fn parse(contents: &str) -> Result<Vec<Instruction>, Error> {
    let mut instructions = Vec::new();

    let mut logical = String::new();
    let mut start_line = 0;
    let mut in_continuation = false;

    for (i, line) in contents.lines().enumerate() {
        let lineno = i + 1;
        let trimmed = line.trim();

        if trimmed.starts_with('#') {
            // comments are allowed inside continuations too
            continue;
        }
        if trimmed.is_empty() {
            continue;
        }

        if !in_continuation {
            start_line = lineno;
        }

        if let Some(stripped) = trimmed.strip_suffix('\\') {
            logical.push_str(stripped.trim_end());
            logical.push(' ');
            in_continuation = true;
            continue;
        }

        logical.push_str(trimmed);
        instructions.push(parse_instruction(&logical, start_line, lineno)?);
        logical.clear();
        in_continuation = false;
    }

    if in_continuation && !logical.trim().is_empty() {
        // trailing continuation with no final line
        let end = contents.lines().count();
        instructions.push(parse_instruction(logical.trim(), start_line, end)?);
    }

    Ok(instructions)
}

fn parse_instruction(text: &str, start_line: usize, end_line: usize) -> Result<Instruction, Error> {
    let text = text.trim();
    let (word, tail) = match text.split_once(char::is_whitespace) {
        Some((word, tail)) => (word, tail.trim()),
        None => (text, ""),
    };

    if word.is_empty() || !word.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(Error::Parse(format!(
            "unable to parse instruction on line {start_line}: {text}"
        )));
    }
    let cmd = word.to_ascii_uppercase();

    // leading --key[=value] flags precede the instruction's value
    let mut flags = Vec::new();
    let mut rest = tail;
    while rest.starts_with("--") {
        let (flag, remainder) = match rest.split_once(char::is_whitespace) {
            Some((flag, remainder)) => (flag, remainder.trim_start()),
            None => (rest, ""),
        };
        flags.push(flag.to_string());
        rest = remainder;
    }

    let (value, json) = parse_value(&cmd, rest);

    Ok(Instruction {
        cmd,
        original: text.to_string(),
        value,
        flags,
        json,
        start_line,
        end_line,
    })
}

fn parse_value(cmd: &str, rest: &str) -> (Vec<String>, bool) {
    // exec form: the tail is a JSON string array
    if rest.starts_with('[')
        && let Ok(array) = serde_json::from_str::<Vec<String>>(rest)
    {
        return (array, true);
    }

    match cmd {
        "ENV" | "LABEL" => (parse_pairs(rest), false),
        // shell form keeps the whole tail as one value
        "RUN" | "CMD" | "ENTRYPOINT" => {
            if rest.is_empty() {
                (Vec::new(), false)
            } else {
                (vec![rest.to_string()], false)
            }
        }
        _ => (tokenize(rest), false),
    }
}

/// Parse ENV/LABEL pairs into a flattened `[k, v, k, v, ...]` list.
///
/// Supports both the `K=V K2=V2` form and the legacy space-separated
/// `ENV KEY some value` form.
fn parse_pairs(rest: &str) -> Vec<String> {
    let tokens = tokenize(rest);
    if tokens.is_empty() {
        return Vec::new();
    }

    if tokens[0].contains('=') {
        let mut pairs = Vec::new();
        for token in &tokens {
            match token.split_once('=') {
                Some((k, v)) => {
                    pairs.push(k.to_string());
                    pairs.push(v.to_string());
                }
                None => {
                    // stray token in K=V form; treat as a key with empty value
                    pairs.push(token.clone());
                    pairs.push(String::new());
                }
            }
        }
        pairs
    } else {
        vec![tokens[0].clone(), tokens[1..].join(" ")]
    }
}
