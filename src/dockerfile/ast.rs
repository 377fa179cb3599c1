//! Builds the stage/layer/shell-command tree from the flat instruction
//! list, and renders it back to canonical Dockerfile text.

use super::Error;
use super::layer::Layer;
use super::parser::{self, Instruction};
use super::stage::Stage;

#[derive(Debug)]
pub(crate) struct Tree {
    /// Global ARG lines preceding the first FROM, preserved verbatim so
    /// the round-trip stays faithful.
    pub global_args: Vec<String>,
    pub stages: Vec<Stage>,
}

/// Build the AST from parsed instructions.
///
/// A Dockerfile must begin with FROM, optionally preceded by global ARGs
/// (comments and directives were already dropped by the parser). Every
/// instruction after the first FROM becomes a layer of the stage opened
/// by the nearest preceding FROM.
pub(crate) fn build(instructions: &[Instruction]) -> Result<Tree, Error> {
    let mut global_args = Vec::new();
    let mut first_stage = None;

    for (i, inst) in instructions.iter().enumerate() {
        match inst.cmd.as_str() {
            "FROM" => {
                first_stage = Some(i);
                break;
            }
            "ARG" => global_args.push(inst.original.clone()),
            cmd => {
                return Err(Error::Validation(format!(
                    "a dockerfile must begin with a FROM or ARG statement, {cmd} found"
                )));
            }
        }
    }

    let Some(first_stage) = first_stage else {
        return Err(Error::Validation(
            "dockerfile contains no FROM statement".to_string(),
        ));
    };

    let mut stages: Vec<Stage> = Vec::new();
    let mut layer_index = 0;

    for inst in &instructions[first_stage..] {
        if inst.cmd == "FROM" {
            stages.push(Stage::from_instruction(stages.len(), inst)?);
            layer_index = 0;
            continue;
        }

        if !parser::is_known_instruction(&inst.cmd) {
            return Err(Error::Validation(format!(
                "{} is not a valid dockerfile command",
                inst.cmd
            )));
        }

        let layer = Layer::from_instruction(layer_index, inst);
        stages
            .last_mut()
            .expect("instructions before the first FROM were handled above")
            .layers_mut()
            .push(layer);
        layer_index += 1;
    }

    Ok(Tree {
        global_args,
        stages,
    })
}

/// Render the tree back to Dockerfile text, reassigning line numbers as
/// each statement is emitted so they always describe the rendered file.
///
/// Multi-line continuations were collapsed at parse time and are not
/// restored; the output is semantically equivalent.
pub(crate) fn flatten(global_args: &[String], stages: &mut [Stage]) -> String {
    let mut out = String::new();
    let mut line = 1;

    for arg in global_args {
        out.push_str(arg);
        out.push('\n');
        line += 1;
    }
    if !global_args.is_empty() {
        out.push('\n');
        line += 1;
    }

    let stage_count = stages.len();
    for (i, stage) in stages.iter_mut().enumerate() {
        stage.set_line(line);
        out.push_str(stage.text());
        out.push_str("\n\n");
        line += 2;

        for layer in stage.layers_mut() {
            layer.set_line(line);
            out.push_str(layer.text());
            out.push('\n');
            line += 1;
        }

        if i + 1 < stage_count {
            out.push('\n');
            line += 1;
        }
    }

    out
}
