use indexmap::IndexMap;

use super::parser::Instruction;
use super::shell::{CommandForm, OptionValue, ShellCommand, parse_options, split_chained_commands};

/// Fields shared by every layer kind.
#[derive(Debug, Clone)]
pub struct LayerHeader {
    pub(crate) index: usize,
    pub(crate) line: usize,
    pub(crate) stage_index: usize,
    command: String,
    flags: IndexMap<String, OptionValue>,
    raw_flags: Vec<String>,
    original: String,
}

impl LayerHeader {
    fn from_instruction(index: usize, inst: &Instruction) -> Self {
        Self {
            index,
            line: inst.start_line,
            stage_index: 0,
            command: inst.cmd.clone(),
            flags: parse_options(&inst.flags),
            raw_flags: inst.flags.clone(),
            original: inst.original.clone(),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// First line of this layer in the rendered Dockerfile.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn stage_index(&self) -> usize {
        self.stage_index
    }

    pub fn flags(&self) -> &IndexMap<String, OptionValue> {
        &self.flags
    }

    /// The complete layer as text, ie command + parameters.
    pub fn text(&self) -> &str {
        &self.original
    }
}

#[derive(Debug, Clone)]
pub struct EnvLayer {
    header: LayerHeader,
    vars: IndexMap<String, String>,
}

impl EnvLayer {
    /// Variables assigned by this layer, in declaration order.
    pub fn env_vars(&self) -> &IndexMap<String, String> {
        &self.vars
    }
}

#[derive(Debug, Clone)]
pub struct CopyLayer {
    header: LayerHeader,
    src: Vec<String>,
    dest: String,
}

impl CopyLayer {
    pub fn src(&self) -> &[String] {
        &self.src
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }

    /// The raw `--from` flag value, if any.
    pub fn from_value(&self) -> Option<&str> {
        self.header.flags.get("from").and_then(OptionValue::as_str)
    }

    /// Whether this layer copies from the build context, ie no `--from`.
    ///
    /// eg- "COPY --from=build /app /app" -> false
    ///     "COPY node_modules ." -> true
    pub fn copies_from_build_context(&self) -> bool {
        !self.header.flags.contains_key("from")
    }
}

#[derive(Debug, Clone)]
pub struct RunLayer {
    header: LayerHeader,
    form: CommandForm,
    commands: Vec<ShellCommand>,
    // len() == commands.len() - 1 when the chain has more than one command
    operators: Vec<String>,
}

impl RunLayer {
    pub fn form(&self) -> CommandForm {
        self.form
    }

    pub fn shell_commands(&self) -> &[ShellCommand] {
        &self.commands
    }

    /// Replace the command at `index` in the chain, rebuilding the layer
    /// text. An exec-form layer degrades to shell form holding the single
    /// new command.
    pub(crate) fn replace_command(&mut self, index: usize, new_cmd: &str) {
        match self.form {
            CommandForm::Exec => {
                self.form = CommandForm::Shell;
                self.commands = vec![ShellCommand::from_text(new_cmd)];
                self.operators.clear();
            }
            CommandForm::Shell => {
                self.commands[index] = ShellCommand::from_text(new_cmd);
            }
        }
        self.header.original = self.rebuild_text();
    }

    /// Reassemble the instruction text from command, flags and the
    /// operator-interleaved chain.
    fn rebuild_text(&self) -> String {
        let mut chain = String::new();
        for (i, cmd) in self.commands.iter().enumerate() {
            if i > 0 {
                chain.push(' ');
                chain.push_str(&self.operators[i - 1]);
                chain.push(' ');
            }
            chain.push_str(cmd.text());
        }

        let mut parts = vec![self.header.command.as_str()];
        parts.extend(self.header.raw_flags.iter().map(String::as_str));
        parts.push(&chain);
        parts.join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct LabelLayer {
    header: LayerHeader,
    labels: IndexMap<String, String>,
}

impl LabelLayer {
    pub fn labels(&self) -> &IndexMap<String, String> {
        &self.labels
    }
}

#[derive(Debug, Clone)]
pub struct OtherLayer {
    header: LayerHeader,
}

/// A single instruction inside a stage.
///
/// Layers the rules introspect get their own variant; everything else is
/// `Other`. All variants share a `LayerHeader`.
#[derive(Debug, Clone)]
pub enum Layer {
    Env(EnvLayer),
    Copy(CopyLayer),
    Run(RunLayer),
    Label(LabelLayer),
    Other(OtherLayer),
}

impl Layer {
    /// Build a layer of the right kind from a parsed instruction.
    pub(crate) fn from_instruction(index: usize, inst: &Instruction) -> Self {
        let header = LayerHeader::from_instruction(index, inst);
        match inst.cmd.as_str() {
            "RUN" => Layer::Run(build_run_layer(header, inst)),
            "COPY" => {
                let (src, dest) = match inst.value.split_last() {
                    Some((dest, src)) => (src.to_vec(), dest.clone()),
                    None => (Vec::new(), String::new()),
                };
                Layer::Copy(CopyLayer { header, src, dest })
            }
            "ENV" => Layer::Env(EnvLayer {
                header,
                vars: pairs_to_map(&inst.value),
            }),
            "LABEL" => Layer::Label(LabelLayer {
                header,
                labels: pairs_to_map(&inst.value),
            }),
            _ => Layer::Other(OtherLayer { header }),
        }
    }

    pub fn header(&self) -> &LayerHeader {
        match self {
            Layer::Env(l) => &l.header,
            Layer::Copy(l) => &l.header,
            Layer::Run(l) => &l.header,
            Layer::Label(l) => &l.header,
            Layer::Other(l) => &l.header,
        }
    }

    pub(crate) fn header_mut(&mut self) -> &mut LayerHeader {
        match self {
            Layer::Env(l) => &mut l.header,
            Layer::Copy(l) => &mut l.header,
            Layer::Run(l) => &mut l.header,
            Layer::Label(l) => &mut l.header,
            Layer::Other(l) => &mut l.header,
        }
    }

    pub fn command(&self) -> &str {
        self.header().command()
    }

    pub fn index(&self) -> usize {
        self.header().index()
    }

    pub fn line(&self) -> usize {
        self.header().line()
    }

    pub fn text(&self) -> &str {
        self.header().text()
    }

    pub fn as_run(&self) -> Option<&RunLayer> {
        match self {
            Layer::Run(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_copy(&self) -> Option<&CopyLayer> {
        match self {
            Layer::Copy(l) => Some(l),
            _ => None,
        }
    }

    pub(crate) fn as_run_mut(&mut self) -> Option<&mut RunLayer> {
        match self {
            Layer::Run(l) => Some(l),
            _ => None,
        }
    }

    /// Fix up this layer's position and the back-indices of any shell
    /// commands it owns.
    pub(crate) fn set_position(&mut self, stage_index: usize, index: usize) {
        let header = self.header_mut();
        header.stage_index = stage_index;
        header.index = index;
        let line = header.line;
        if let Some(run) = self.as_run_mut() {
            for (i, cmd) in run.commands.iter_mut().enumerate() {
                // single rendered line once continuations are collapsed
                let cmd_line = cmd.line().max(line);
                cmd.set_position(stage_index, index, i, cmd_line);
            }
        }
    }

    /// Reassign this layer's line, propagating to owned shell commands.
    pub(crate) fn set_line(&mut self, line: usize) {
        self.header_mut().line = line;
        if let Some(run) = self.as_run_mut() {
            for cmd in run.commands.iter_mut() {
                let (stage, layer, index) = (cmd.stage_index(), cmd.layer_index(), cmd.index());
                cmd.set_position(stage, layer, index, line);
            }
        }
    }
}

fn build_run_layer(header: LayerHeader, inst: &Instruction) -> RunLayer {
    if inst.json {
        let mut cmd = ShellCommand::from_exec_tokens(inst.value.clone());
        cmd.set_position(0, 0, 0, inst.start_line);
        return RunLayer {
            header,
            form: CommandForm::Exec,
            commands: vec![cmd],
            operators: Vec::new(),
        };
    }

    let chain = match inst.value.first() {
        Some(text) => split_chained_commands(text),
        None => Vec::new(),
    };

    let mut commands = Vec::new();
    let mut operators = Vec::new();
    for (i, part) in chain.into_iter().enumerate() {
        if i % 2 == 1 {
            operators.push(part);
        } else {
            commands.push(ShellCommand::from_text(&part));
        }
    }

    // spread commands across the original statement's line span
    for (i, cmd) in commands.iter_mut().enumerate() {
        let line = (inst.start_line + i).min(inst.end_line);
        cmd.set_position(0, 0, i, line);
    }

    RunLayer {
        header,
        form: CommandForm::Shell,
        commands,
        operators,
    }
}

fn pairs_to_map(pairs: &[String]) -> IndexMap<String, String> {
    pairs
        .chunks(2)
        .map(|pair| {
            let key = pair[0].clone();
            let value = pair.get(1).cloned().unwrap_or_default();
            (key, value)
        })
        .collect()
}
