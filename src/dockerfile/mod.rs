//! A mutable, re-serializable model of a Dockerfile.
//!
//! The tree is stages -> layers -> shell commands. The `Dockerfile` object
//! is the sole write surface: every other node type is a read-only view
//! obtained through it, and every write realigns indices and regenerates
//! the canonical text before returning.

mod ast;
mod image;
mod layer;
mod parser;
mod shell;
mod stage;

pub use image::Image;
pub use layer::{CopyLayer, EnvLayer, LabelLayer, Layer, OtherLayer, RunLayer};
pub use shell::{CommandForm, OptionValue, ShellCommand, split_chained_commands};
pub use stage::Stage;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum Error {
    /// The Dockerfile text could not be parsed.
    #[error("failed to parse Dockerfile: {0}")]
    Parse(String),
    /// The text parsed but does not form a valid Dockerfile.
    #[error("invalid Dockerfile: {0}")]
    Validation(String),
}

/// Coordinates of a layer inside the tree.
///
/// Derived from a read-only view; stays valid until the next write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRef {
    pub stage: usize,
    pub layer: usize,
}

impl LayerRef {
    pub fn of(layer: &Layer) -> Self {
        Self {
            stage: layer.header().stage_index(),
            layer: layer.index(),
        }
    }
}

/// Coordinates of a shell command inside a RUN layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShellCommandRef {
    pub stage: usize,
    pub layer: usize,
    pub command: usize,
}

impl ShellCommandRef {
    pub fn of(cmd: &ShellCommand) -> Self {
        Self {
            stage: cmd.stage_index(),
            layer: cmd.layer_index(),
            command: cmd.index(),
        }
    }
}

/// A parsed Dockerfile.
///
/// Owns the stage vector exclusively. Writes keep the tree and `raw()` in
/// sync: each mutation realigns stage/layer/shell-command indices and
/// re-renders the canonical text before returning.
#[derive(Debug, Clone)]
pub struct Dockerfile {
    raw: String,
    global_args: Vec<String>,
    stages: Vec<Stage>,
}

impl Dockerfile {
    pub fn parse(contents: &str) -> Result<Self, Error> {
        if contents.trim().is_empty() {
            return Err(Error::Validation(
                "cannot create a Dockerfile from empty contents".to_string(),
            ));
        }

        let instructions = parser::parse(contents)?;
        let tree = ast::build(&instructions)?;

        let mut dockerfile = Self {
            raw: contents.to_string(),
            global_args: tree.global_args,
            stages: tree.stages,
        };
        dockerfile.realign();
        Ok(dockerfile)
    }

    /// The Dockerfile text. Reflects the tree's current state; until the
    /// first write this is the text passed to `parse`.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// The last stage, which produces the deliverable image.
    pub fn final_stage(&self) -> &Stage {
        self.stages.last().expect("a Dockerfile has at least one stage")
    }

    pub fn stage_by_name(&self, name: &str) -> Option<&Stage> {
        self.stages.iter().find(|s| s.name() == name)
    }

    pub fn layer(&self, r: LayerRef) -> Option<&Layer> {
        self.stages.get(r.stage)?.layers().get(r.layer)
    }

    pub fn shell_command(&self, r: ShellCommandRef) -> Option<&ShellCommand> {
        self.layer(LayerRef {
            stage: r.stage,
            layer: r.layer,
        })?
        .as_run()?
        .shell_commands()
        .get(r.command)
    }

    /// The stage a COPY layer copies from, resolved against the
    /// stage-name table. `--from` values naming an external image (or
    /// nothing at all) yield None.
    pub fn copy_source_stage(&self, copy: &CopyLayer) -> Option<&Stage> {
        self.stage_by_name(copy.from_value()?)
    }

    /// Whether a COPY layer copies from a previous stage of this
    /// Dockerfile.
    ///
    /// eg- "COPY --from=build /app /app" -> true (given a stage "build")
    ///     "COPY --from=nginx:latest /app /app" -> false
    ///     "COPY node_modules ." -> false
    pub fn copy_is_from_previous_stage(&self, copy: &CopyLayer) -> bool {
        self.copy_source_stage(copy).is_some()
    }

    /// Replace the base image of the stage at `stage_index`, rebuilding
    /// the stage header.
    pub fn set_stage_baseimage(&mut self, stage_index: usize, image: Image) -> Result<(), Error> {
        let stage = self.stages.get_mut(stage_index).ok_or_else(|| {
            Error::Validation(format!("stage index {stage_index} out of range"))
        })?;
        stage.set_baseimage(image);
        self.finish_write();
        Ok(())
    }

    /// Replace a single shell command inside a RUN layer.
    ///
    /// `new_cmd` must be a single command; don't pass a chain. An
    /// exec-form layer collapses to shell form holding the new command.
    /// Returns the updated view.
    pub fn replace_shell_command(
        &mut self,
        target: ShellCommandRef,
        new_cmd: &str,
    ) -> Result<ShellCommand, Error> {
        let run = self.run_layer_mut(target)?;
        run.replace_command(target.command, new_cmd);
        self.finish_write();

        let updated = self
            .shell_command(target)
            .expect("target chain slot exists after replacement");
        Ok(updated.clone())
    }

    /// Append a `--name[=value]` option to a shell command.
    ///
    /// A `false` value is a no-op; `true` appends a bare flag; a string
    /// appends `--name=value`. Returns the (possibly unchanged) view.
    pub fn add_option_to_shell_command(
        &mut self,
        target: ShellCommandRef,
        name: &str,
        value: &OptionValue,
    ) -> Result<ShellCommand, Error> {
        let cmd = self
            .shell_command(target)
            .ok_or_else(|| invalid_command_ref(target))?;

        let new_text = match value {
            OptionValue::Bool(false) => return Ok(cmd.clone()),
            OptionValue::Bool(true) => format!("{} --{name}", cmd.text()),
            OptionValue::Str(v) => format!("{} --{name}={v}", cmd.text()),
        };
        self.replace_shell_command(target, &new_text)
    }

    /// Replace a layer with the layers parsed from `statements`. The new
    /// layers inherit the target's line. An empty list is a no-op.
    pub fn replace_layer_with_statements(
        &mut self,
        target: LayerRef,
        statements: &[String],
    ) -> Result<(), Error> {
        if statements.is_empty() {
            return Ok(());
        }

        let line = self
            .layer(target)
            .ok_or_else(|| invalid_layer_ref(target))?
            .line();

        let new_layers = parse_statements(statements, target.layer, line)?;
        self.stages[target.stage]
            .layers_mut()
            .splice(target.layer..=target.layer, new_layers);
        self.finish_write();
        Ok(())
    }

    /// Insert a single statement immediately after the given layer.
    pub fn insert_after_layer(&mut self, target: LayerRef, statement: &str) -> Result<(), Error> {
        let line = self
            .layer(target)
            .ok_or_else(|| invalid_layer_ref(target))?
            .line();

        let statements = [statement.to_string()];
        let mut new_layers = parse_statements(&statements, target.layer + 1, line + 1)?;
        if new_layers.len() != 1 {
            return Err(Error::Validation(format!(
                "expected exactly one statement, got {}: {statement}",
                new_layers.len()
            )));
        }
        self.stages[target.stage]
            .layers_mut()
            .insert(target.layer + 1, new_layers.remove(0));
        self.finish_write();
        Ok(())
    }

    fn run_layer_mut(&mut self, r: ShellCommandRef) -> Result<&mut RunLayer, Error> {
        let run = self
            .stages
            .get_mut(r.stage)
            .and_then(|s| s.layers_mut().get_mut(r.layer))
            .and_then(Layer::as_run_mut)
            .ok_or_else(|| invalid_command_ref(r))?;
        if r.command >= run.shell_commands().len() {
            return Err(invalid_command_ref(r));
        }
        Ok(run)
    }

    /// Realign indices and regenerate the canonical text. Runs after
    /// every write.
    fn finish_write(&mut self) {
        self.realign();
        self.raw = ast::flatten(&self.global_args, &mut self.stages);
    }

    fn realign(&mut self) {
        for (i, stage) in self.stages.iter_mut().enumerate() {
            stage.set_index(i);
            for (j, layer) in stage.layers_mut().iter_mut().enumerate() {
                layer.set_position(i, j);
            }
        }
    }
}

fn parse_statements(
    statements: &[String],
    first_index: usize,
    first_line: usize,
) -> Result<Vec<Layer>, Error> {
    let parsed = parser::parse(&statements.join("\n"))?;

    let mut layers = Vec::with_capacity(parsed.len());
    for (i, inst) in parsed.iter().enumerate() {
        if inst.cmd == "FROM" {
            return Err(Error::Validation(
                "cannot splice a FROM statement into a stage".to_string(),
            ));
        }
        if !parser::is_known_instruction(&inst.cmd) {
            return Err(Error::Validation(format!(
                "{} is not a valid dockerfile command",
                inst.cmd
            )));
        }
        let mut layer = Layer::from_instruction(first_index + i, inst);
        layer.set_line(first_line + i);
        layers.push(layer);
    }
    Ok(layers)
}

fn invalid_layer_ref(r: LayerRef) -> Error {
    Error::Validation(format!(
        "no layer at stage {} index {}",
        r.stage, r.layer
    ))
}

fn invalid_command_ref(r: ShellCommandRef) -> Error {
    Error::Validation(format!(
        "no shell command at stage {} layer {} index {}",
        r.stage, r.layer, r.command
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MULTI_STAGE: &str = "FROM node:20 AS build\nWORKDIR /app\nCOPY . .\nRUN npm ci && npm run build\n\nFROM node:20\nWORKDIR /app\nCOPY --from=build /app/dist ./dist\nRUN npm ci\nCMD [\"node\", \"server.js\"]\n";

    /// Walk the whole tree checking the index invariants.
    fn assert_aligned(df: &Dockerfile) {
        for (i, stage) in df.stages().iter().enumerate() {
            assert_eq!(stage.index(), i, "stage index mismatch");
            for (j, layer) in stage.layers().iter().enumerate() {
                assert_eq!(layer.index(), j, "layer index mismatch");
                assert_eq!(layer.header().stage_index(), i, "layer stage back-index");
                if let Some(run) = layer.as_run() {
                    for (k, cmd) in run.shell_commands().iter().enumerate() {
                        assert_eq!(cmd.index(), k, "shell command index");
                        assert_eq!(cmd.stage_index(), i, "shell command stage back-index");
                        assert_eq!(cmd.layer_index(), j, "shell command layer back-index");
                    }
                }
            }
        }
    }

    /// Re-parsing raw() must yield a tree that flattens to raw() again.
    fn assert_raw_matches_tree(df: &Dockerfile) {
        let mut reparsed = Dockerfile::parse(df.raw()).unwrap();
        let args = reparsed.global_args.clone();
        let flattened = ast::flatten(&args, &mut reparsed.stages);
        assert_eq!(df.raw(), flattened);
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert!(matches!(
            Dockerfile::parse("").unwrap_err(),
            Error::Validation(_)
        ));
        assert!(matches!(
            Dockerfile::parse("  \n \n").unwrap_err(),
            Error::Validation(_)
        ));
    }

    #[test]
    fn test_parse_basic_accessors() {
        let df = Dockerfile::parse(MULTI_STAGE).unwrap();
        assert_eq!(df.stage_count(), 2);
        assert_eq!(df.final_stage().index(), 1);
        assert_eq!(df.stage_by_name("build").unwrap().index(), 0);
        assert!(df.stage_by_name("missing").is_none());
        assert_eq!(df.raw(), MULTI_STAGE);
        assert_aligned(&df);
    }

    #[test]
    fn test_copy_source_stage_resolution() {
        let df = Dockerfile::parse(MULTI_STAGE).unwrap();
        let copy = df.final_stage().layers()[1].as_copy().unwrap();
        assert!(df.copy_is_from_previous_stage(copy));
        assert_eq!(df.copy_source_stage(copy).unwrap().name(), "build");

        // --from naming an image, not a stage
        let df =
            Dockerfile::parse("FROM node:20\nCOPY --from=nginx:latest /etc/nginx /etc/nginx\n")
                .unwrap();
        let copy = df.final_stage().layers()[0].as_copy().unwrap();
        assert!(!df.copy_is_from_previous_stage(copy));
        assert!(df.copy_source_stage(copy).is_none());
    }

    #[test]
    fn test_set_stage_baseimage() {
        let mut df = Dockerfile::parse(MULTI_STAGE).unwrap();
        df.set_stage_baseimage(1, Image::new("node:20-alpine")).unwrap();

        assert_eq!(df.final_stage().baseimage().full_name(), "node:20-alpine");
        assert!(df.raw().contains("FROM node:20-alpine"));
        // the build stage is untouched
        assert_eq!(df.stages()[0].baseimage().full_name(), "node:20");
        assert_aligned(&df);
        assert_raw_matches_tree(&df);
    }

    #[test]
    fn test_replace_shell_command_in_chain() {
        let mut df = Dockerfile::parse(MULTI_STAGE).unwrap();
        let run = df.stages()[0].layers()[2].as_run().unwrap();
        let target = ShellCommandRef::of(&run.shell_commands()[0]);

        let updated = df.replace_shell_command(target, "npm ci --omit=dev").unwrap();
        assert_eq!(updated.text(), "npm ci --omit=dev");
        assert!(df.raw().contains("RUN npm ci --omit=dev && npm run build"));
        assert_aligned(&df);
        assert_raw_matches_tree(&df);
    }

    #[test]
    fn test_replace_shell_command_degrades_exec_form() {
        let mut df = Dockerfile::parse("FROM node:20\nRUN [\"npm\", \"ci\"]\n").unwrap();
        let run = df.final_stage().layers()[0].as_run().unwrap();
        let target = ShellCommandRef::of(&run.shell_commands()[0]);

        df.replace_shell_command(target, "npm ci --omit=dev").unwrap();
        let run = df.final_stage().layers()[0].as_run().unwrap();
        assert_eq!(run.form(), CommandForm::Shell);
        assert!(df.raw().contains("RUN npm ci --omit=dev"));
        assert_aligned(&df);
    }

    #[test]
    fn test_add_option_to_shell_command() {
        let mut df = Dockerfile::parse("FROM node:20\nFROM node:20\nRUN npm install\n").unwrap();
        let run = df.final_stage().layers()[0].as_run().unwrap();
        let target = ShellCommandRef::of(&run.shell_commands()[0]);

        // false is a no-op
        let unchanged = df
            .add_option_to_shell_command(target, "production", &OptionValue::Bool(false))
            .unwrap();
        assert_eq!(unchanged.text(), "npm install");

        let updated = df
            .add_option_to_shell_command(target, "production", &OptionValue::Bool(true))
            .unwrap();
        assert_eq!(updated.text(), "npm install --production");

        let updated = df
            .add_option_to_shell_command(target, "omit", &OptionValue::Str("dev".to_string()))
            .unwrap();
        assert_eq!(updated.text(), "npm install --production --omit=dev");
        assert_aligned(&df);
    }

    #[test]
    fn test_replace_layer_with_statements() {
        let mut df = Dockerfile::parse(
            "FROM node:20 AS build\nRUN npm ci\n\nFROM node:20\nCOPY node_modules ./node_modules\nCMD [\"node\", \"server.js\"]\n",
        )
        .unwrap();
        let target = LayerRef::of(&df.final_stage().layers()[0]);

        df.replace_layer_with_statements(
            target,
            &["COPY package*.json ./".to_string(), "RUN npm install --production".to_string()],
        )
        .unwrap();

        let layers = df.final_stage().layers();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[0].text(), "COPY package*.json ./");
        assert_eq!(layers[1].text(), "RUN npm install --production");
        assert_eq!(layers[2].command(), "CMD");
        assert!(!df.raw().contains("COPY node_modules"));
        assert_aligned(&df);
        assert_raw_matches_tree(&df);
    }

    #[test]
    fn test_replace_layer_with_empty_statements_is_noop() {
        let mut df = Dockerfile::parse(MULTI_STAGE).unwrap();
        let before = df.raw().to_string();
        let target = LayerRef::of(&df.final_stage().layers()[0]);
        df.replace_layer_with_statements(target, &[]).unwrap();
        assert_eq!(df.raw(), before);
    }

    #[test]
    fn test_insert_after_layer() {
        let mut df = Dockerfile::parse("FROM node:20\nWORKDIR /app\nRUN npm ci\n").unwrap();
        let target = LayerRef::of(&df.final_stage().layers()[0]);

        df.insert_after_layer(target, "ENV NODE_ENV=production").unwrap();

        let layers = df.final_stage().layers();
        assert_eq!(layers.len(), 3);
        assert_eq!(layers[1].text(), "ENV NODE_ENV=production");
        assert_eq!(layers[2].command(), "RUN");
        assert_aligned(&df);
    }

    #[test]
    fn test_splicing_from_statement_is_rejected() {
        let mut df = Dockerfile::parse("FROM node:20\nRUN npm ci\n").unwrap();
        let target = LayerRef::of(&df.final_stage().layers()[0]);
        let err = df
            .replace_layer_with_statements(target, &["FROM node:alpine".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");
    }

    #[test]
    fn test_lines_refer_to_modified_file_after_write() {
        let mut df = Dockerfile::parse(MULTI_STAGE).unwrap();
        df.set_stage_baseimage(1, Image::new("node:20-alpine")).unwrap();

        let lines: Vec<&str> = df.raw().lines().collect();
        for stage in df.stages() {
            assert_eq!(lines[stage.line() - 1], stage.text());
            for layer in stage.layers() {
                assert_eq!(lines[layer.line() - 1], layer.text());
            }
        }
    }
}
