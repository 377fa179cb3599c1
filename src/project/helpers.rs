//! Lookup tables and classifiers for the Node.js dependency rules.

use crate::ai::ScriptInvocation;
use crate::dockerfile::{CopyLayer, Dockerfile, Layer, OptionValue, ShellCommand, Stage};
use crate::package_json::PackageJson;

pub(crate) const NODE_ENV_PRODUCTION: &str = "production";

/// A production-only option an install/removal command may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProdOpt {
    /// A bare `--flag`.
    Flag,
    /// A `--key=value` pair with this value.
    Value(&'static str),
}

impl ProdOpt {
    pub(crate) fn to_option_value(self) -> OptionValue {
        match self {
            ProdOpt::Flag => OptionValue::Bool(true),
            ProdOpt::Value(v) => OptionValue::Str(v.to_string()),
        }
    }

    fn matches(self, value: &OptionValue) -> bool {
        match self {
            ProdOpt::Flag => value.as_bool() == Some(true),
            ProdOpt::Value(v) => value.as_str() == Some(v),
        }
    }
}

// The first entry of each set is the fix applied to an offending command.
const NPM_INSTALL_PROD: &[(&str, ProdOpt)] =
    &[("production", ProdOpt::Flag), ("omit", ProdOpt::Value("dev"))];
const NPM_CI_PROD: &[(&str, ProdOpt)] = &[("omit", ProdOpt::Value("dev"))];
const YARN_INSTALL_PROD: &[(&str, ProdOpt)] = &[("production", ProdOpt::Flag)];

// Older versions of npm allowed --production with prune.
const NPM_PRUNE_DEV: &[(&str, ProdOpt)] =
    &[("omit", ProdOpt::Value("dev")), ("production", ProdOpt::Flag)];

/// The prod-only option set for a dependency installation command, or
/// None if the command doesn't install node modules.
fn install_prod_options(program: &str, subcommand: &str) -> Option<&'static [(&'static str, ProdOpt)]> {
    match (program, subcommand) {
        ("npm", "install" | "i" | "add") => Some(NPM_INSTALL_PROD),
        ("npm", "ci" | "clean-install" | "install-clean") => Some(NPM_CI_PROD),
        ("yarn", "install") => Some(YARN_INSTALL_PROD),
        _ => None,
    }
}

fn removal_dev_options(program: &str, subcommand: &str) -> Option<&'static [(&'static str, ProdOpt)]> {
    match (program, subcommand) {
        ("npm", "prune") => Some(NPM_PRUNE_DEV),
        _ => None,
    }
}

/// Whether the command installs node dependencies ("npm install",
/// "yarn install", "npm ci", ...).
pub(crate) fn command_installs_node_modules(cmd: &ShellCommand) -> bool {
    install_prod_options(cmd.program(), cmd.subcommand()).is_some()
}

/// Whether an installation command carries a production-only option, ie
/// excludes devDependencies.
pub(crate) fn install_command_uses_prod_option(cmd: &ShellCommand) -> bool {
    let Some(prod_opts) = install_prod_options(cmd.program(), cmd.subcommand()) else {
        return false;
    };
    cmd.options().iter().any(|(name, value)| {
        prod_opts
            .iter()
            .any(|(n, opt)| *n == name.as_str() && opt.matches(value))
    })
}

/// Whether the command deletes devDependencies, eg "npm prune --omit=dev".
pub(crate) fn command_removes_dev_dependencies(cmd: &ShellCommand, node_env: &str) -> bool {
    let Some(dev_opts) = removal_dev_options(cmd.program(), cmd.subcommand()) else {
        return false;
    };
    if node_env == NODE_ENV_PRODUCTION {
        return true;
    }
    cmd.options().iter().any(|(name, value)| {
        dev_opts
            .iter()
            .any(|(n, opt)| *n == name.as_str() && opt.matches(value))
    })
}

/// The option to add to an offending install command to make it skip
/// devDependencies.
pub(crate) fn prod_option_for(cmd: &ShellCommand) -> Option<(&'static str, OptionValue)> {
    let (name, opt) = install_prod_options(cmd.program(), cmd.subcommand())?.first()?;
    Some((name, opt.to_option_value()))
}

/// Determine whether the given stage ends up with devDependencies
/// installed, returning the offending command if so.
///
/// Layers are visited top to bottom, tracking NODE_ENV. An install
/// command running under NODE_ENV=production or with a prod option
/// clears any earlier violation; one without marks a violation; a
/// dev-dependency removal clears it. The state after the last
/// install/removal command is the answer.
pub(crate) fn stage_installs_dev_dependencies(stage: &Stage) -> Option<&ShellCommand> {
    let mut offending: Option<&ShellCommand> = None;
    let mut node_env = "";

    for layer in stage.layers() {
        match layer {
            Layer::Env(env) => {
                node_env = env
                    .env_vars()
                    .get("NODE_ENV")
                    .map(String::as_str)
                    .unwrap_or("");
            }
            Layer::Run(run) => {
                for cmd in run.shell_commands() {
                    if command_installs_node_modules(cmd) {
                        if node_env == NODE_ENV_PRODUCTION
                            || install_command_uses_prod_option(cmd)
                        {
                            offending = None;
                        } else {
                            offending = Some(cmd);
                        }
                    } else if command_removes_dev_dependencies(cmd, node_env) {
                        offending = None;
                    }
                }
            }
            _ => {}
        }
    }

    offending
}

/// Whether the COPY layer copies a node_modules directory into the
/// stage. Only the last path component is checked; a parent directory
/// that happens to contain node_modules is not detected.
///
/// eg- "COPY --from=build /app/node_modules ." -> true
///     "COPY /app /app" -> false
pub(crate) fn layer_copies_node_modules(copy: &CopyLayer) -> bool {
    copy.src().iter().any(|src| basename(src) == "node_modules")
}

fn basename(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    trimmed.rsplit('/').next().unwrap_or(trimmed)
}

/// Collect the npm scripts invoked anywhere in the Dockerfile together
/// with their definitions from package.json.
///
/// "npm start" and "npm run start" are the same script; an invoked but
/// undefined "start" falls back to npm's implicit "node server.js".
pub(crate) fn extract_npm_scripts_invoked(
    dockerfile: &Dockerfile,
    package_json: &PackageJson,
) -> Vec<ScriptInvocation> {
    let mut scripts = Vec::new();

    for stage in dockerfile.stages() {
        for layer in stage.layers() {
            let Some(run) = layer.as_run() else { continue };
            for cmd in run.shell_commands() {
                if cmd.program() != "npm" {
                    continue;
                }

                match cmd.subcommand() {
                    "start" => {
                        let contents = package_json.script("start").unwrap_or("node server.js");
                        scripts.push(ScriptInvocation {
                            command: cmd.text().to_string(),
                            script_contents: contents.to_string(),
                        });
                    }
                    "run" | "run-script" => {
                        // args[0] is the subcommand, args[1] the script name
                        let Some(name) = cmd.args().get(1).copied() else {
                            continue;
                        };
                        let contents = match package_json.script(name) {
                            Some(contents) => contents,
                            None if name == "start" => "node server.js",
                            None => "(No definition found in package.json)",
                        };
                        scripts.push(ScriptInvocation {
                            command: cmd.text().to_string(),
                            script_contents: contents.to_string(),
                        });
                    }
                    _ => {}
                }
            }
        }
    }

    scripts
}
