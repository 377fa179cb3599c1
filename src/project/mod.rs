//! The rule engine: a fixed sequence of deterministic rules plus one
//! AI-delegated rewrite, all operating on a shared Dockerfile.
//!
//! Rules never interact except through the Dockerfile: when two could
//! conflict, the earlier one wins and the later one must detect the
//! already-satisfied state and become a no-op. Adding a rule means adding
//! one method to the fixed call sequence in [`Project::optimize`].

mod action;
mod helpers;

pub use action::OptimizationAction;

use serde::Serialize;

use crate::ai::AiService;
use crate::dockerfile::{Dockerfile, Image, LayerRef, ShellCommandRef};
use crate::dockerignore::Dockerignore;
use crate::package_json::PackageJson;

const DOCKERFILE_NAME: &str = "Dockerfile";

/// Entries every project should keep out of the build context.
const IGNORE_ENTRIES: &[&str] = &["node_modules", "npm_debug.log", ".git"];

/// The project files after optimization. Unchanged fields are returned
/// as-is so the caller always gets a complete set.
#[derive(Debug, Serialize)]
pub struct ModifiedProject {
    #[serde(rename = "Dockerfile")]
    pub dockerfile: String,
    #[serde(rename = ".dockerignore")]
    pub dockerignore: String,
    #[serde(rename = "package.json", skip_serializing_if = "Option::is_none")]
    pub package_json: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct OptimizationReport {
    pub actions_taken: Vec<OptimizationAction>,
    pub recommendations: Vec<OptimizationAction>,
    pub modified_project: ModifiedProject,
}

/// A Node.js project under optimization: the Dockerfile plus its
/// collaborators, and the notes accumulated by the rules.
pub struct Project {
    dockerfile: Dockerfile,
    dockerignore: Dockerignore,
    package_json: Option<PackageJson>,
    actions_taken: Vec<OptimizationAction>,
    recommendations: Vec<OptimizationAction>,
}

impl Project {
    pub fn new(
        dockerfile: Dockerfile,
        dockerignore: Dockerignore,
        package_json: Option<PackageJson>,
    ) -> Self {
        Self {
            dockerfile,
            dockerignore,
            package_json,
            actions_taken: Vec::new(),
            recommendations: Vec::new(),
        }
    }

    /// Run the full rule sequence and assemble the result.
    ///
    /// The AI-powered rule runs first so the deterministic checks operate
    /// on whatever final-stage structure exists afterwards.
    pub fn optimize(mut self, ai: Option<&dyn AiService>) -> OptimizationReport {
        self.ensure_dockerignore();

        // Multistage is tried first: in the final stage you can use a
        // light base image and cherry-pick what you need, and every
        // later rule then operates on that final stage.
        if let Some(ai) = ai
            && self.dockerfile.stage_count() == 1
        {
            self.use_multistage_builds(ai);
        }

        self.finalstage_use_light_baseimage();
        self.exclude_dev_dependencies();

        OptimizationReport {
            actions_taken: self.actions_taken,
            recommendations: self.recommendations,
            modified_project: ModifiedProject {
                dockerfile: self.dockerfile.raw().to_string(),
                dockerignore: self.dockerignore.raw().to_string(),
                package_json: self.package_json.map(|pj| pj.raw().to_string()),
            },
        }
    }

    /// Make sure .dockerignore exists and excludes the usual suspects.
    fn ensure_dockerignore(&mut self) {
        if !self.dockerignore.exists() {
            tracing::debug!("creating missing .dockerignore");
            self.dockerignore.create();
        }
        let added = self.dockerignore.add_if_not_present(IGNORE_ENTRIES);
        if !added.is_empty() {
            tracing::debug!(entries = ?added, "seeded .dockerignore");
        }
    }

    /// Ask the AI service to rewrite a single-stage Dockerfile to use
    /// multistage builds, validating the result before accepting it. Any
    /// failure downgrades to a recommendation.
    fn use_multistage_builds(&mut self, ai: &dyn AiService) {
        const RULE: &str = "use-multistage-builds";

        let recommendation = OptimizationAction::new(
            RULE,
            DOCKERFILE_NAME,
            "Use Multistage Builds",
            "Create a final stage in Dockerfile using a slim base image such as node alpine.
Use the first stage to test and build the application.
Copy the built application code & assets into the final stage.
Set the \"NODE_ENV\" environment variable to \"production\" and install the dependencies, excluding devDependencies.",
        );

        let scripts = match &self.package_json {
            Some(pj) => helpers::extract_npm_scripts_invoked(&self.dockerfile, pj),
            None => Vec::new(),
        };

        let reply = match ai.add_multistage_builds(self.dockerfile.raw(), &scripts) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "ai service failed to add multistage builds");
                self.recommendations.push(recommendation);
                return;
            }
        };

        let new_dockerfile = match Dockerfile::parse(&reply) {
            Ok(dockerfile) => dockerfile,
            Err(e) => {
                tracing::error!(error = %e, "dockerfile received from ai/multistage is invalid");
                self.recommendations.push(recommendation);
                return;
            }
        };

        if new_dockerfile.stage_count() < 2 {
            tracing::warn!("ai service could not add multistage builds to dockerfile");
            self.recommendations.push(recommendation);
            return;
        }

        self.dockerfile = new_dockerfile;
        self.actions_taken.push(OptimizationAction::new(
            RULE,
            DOCKERFILE_NAME,
            "Implemented Multistage Builds",
            "Multistage Builds have been applied to the Dockerfile.
A new stage has been created with a lighter base Image.
This stage only includes the application code, dependencies and any other assets necessary for running the app.",
        ));
    }

    /// Swap the final stage's base image for a light equivalent, or
    /// recommend it when the only stage is probably also building and
    /// testing.
    fn finalstage_use_light_baseimage(&mut self) {
        const RULE: &str = "final-stage-slim-baseimage";

        let final_stage = self.dockerfile.final_stage();
        let current = final_stage.baseimage().clone();
        if current.is_alpine_or_slim() {
            return;
        }

        let preferred = if current.name() == "node" {
            Image::new(&format!("node:{}", current.alpine_equivalent_tag()))
        } else {
            Image::new("node:alpine")
        };
        let final_index = final_stage.index();

        if self.dockerfile.stage_count() == 1 {
            self.recommendations.push(OptimizationAction::new(
                RULE,
                DOCKERFILE_NAME,
                "Use a smaller base image for the final image produced",
                format!(
                    "Use {} instead of {} as the base image.
This will significantly decrease the final image's size.
This practice is best combined with Multistage builds. The final stage of your Dockerfile must use a slim base image.
Since all testing and build processes take place in a previous stage, dev dependencies and a heavy distro isn't really needed in the final image.",
                    preferred.full_name(),
                    current.full_name()
                ),
            ));
            return;
        }

        tracing::debug!(new_baseimage = %preferred.full_name(), "setting smaller base image for the final stage");
        self.dockerfile
            .set_stage_baseimage(final_index, preferred.clone())
            .expect("final stage index is valid");

        self.actions_taken.push(OptimizationAction::new(
            RULE,
            DOCKERFILE_NAME,
            "Used a new and smaller base image for the final stage in Multistage Dockerfile",
            format!(
                "Used {} instead of {} as the base image of the final stage.
This becomes the base image of the final image produced, reducing the size significantly.",
                preferred.full_name(),
                current.full_name()
            ),
        ));
    }

    /// Keep devDependencies out of the final image: fix offending install
    /// commands, or replace COPYs of node_modules with a fresh
    /// production-only install.
    fn exclude_dev_dependencies(&mut self) {
        const RULE: &str = "exclude-devDependencies";
        const FRESH_INSTALL: [&str; 2] = ["COPY package*.json ./", "RUN npm install --production"];

        let multi_stage = self.dockerfile.stage_count() > 1;

        // First, check the final stage itself for offending installs.
        let offender = helpers::stage_installs_dev_dependencies(self.dockerfile.final_stage())
            .map(|cmd| {
                (
                    ShellCommandRef::of(cmd),
                    cmd.text().to_string(),
                    cmd.line(),
                    helpers::prod_option_for(cmd),
                )
            });

        if let Some((target, old_text, line, prod_option)) = offender {
            if multi_stage {
                let (name, value) = prod_option.expect("an offending command is an install command");
                let updated = self
                    .dockerfile
                    .add_option_to_shell_command(target, name, &value)
                    .expect("offending command outlives classification");

                self.actions_taken.push(
                    OptimizationAction::new(
                        RULE,
                        DOCKERFILE_NAME,
                        "Modified installation command to exclude devDependencies",
                        format!(
                            "The dependency installation command in the last stage '{old_text}' has been modified to '{}'.
This ensures that the final image excludes all modules listed in \"devDependencies\" in package.json and only includes production modules needed by the app at runtime.",
                            updated.text()
                        ),
                    )
                    .with_line(updated.line()),
                );
                return;
            }

            // A single stage probably also builds and tests; changing the
            // command could break that, so only recommend.
            self.recommendations.push(
                OptimizationAction::new(
                    RULE,
                    DOCKERFILE_NAME,
                    "Do not install devDependencies in the final image",
                    "You seem to be installing modules listed in \"devDependencies\" in your package.json.
These modules are suitable in the build/test phase but are not required by your app during runtime.
The final image of your app should not contain these unnecessary dependencies.
Instead, use a command like \"npm install --production\", \"yarn install --production\" or \"npm ci --omit=dev\" to exclude devDependencies.
This is best done using multistage builds.
Create a new (final) stage in the Dockerfile and install node_modules excluding the devDependencies.",
                )
                .with_line(line),
            );
            return;
        }

        // The final stage installs nothing offensive. Check whether it
        // copies node_modules in from somewhere instead.
        enum CopyCase {
            MultiSource,
            BuildContext,
            FromOffendingStage(String),
        }

        let copied_modules = {
            let mut found = None;
            for layer in self.dockerfile.final_stage().layers() {
                let Some(copy) = layer.as_copy() else { continue };
                if !helpers::layer_copies_node_modules(copy) {
                    continue;
                }

                if copy.src().len() > 1 {
                    // removing just node_modules from a multi-source COPY
                    // has no safe automatic split
                    found = Some((layer, CopyCase::MultiSource));
                    break;
                }
                if copy.copies_from_build_context() {
                    found = Some((layer, CopyCase::BuildContext));
                    break;
                }

                // External data source. Only a previous stage of this
                // Dockerfile is considered; other contexts are left alone.
                let Some(source) = self.dockerfile.copy_source_stage(copy) else {
                    break;
                };
                if helpers::stage_installs_dev_dependencies(source).is_some() {
                    found = Some((layer, CopyCase::FromOffendingStage(source.name().to_string())));
                    break;
                }
                // the source stage installs prod deps only; keep scanning
            }
            found.map(|(layer, case)| (LayerRef::of(layer), layer.text().to_string(), layer.line(), case))
        };

        let Some((target, old_text, line, case)) = copied_modules else {
            // Neither installs nor copies: no node_modules in the image.
            return;
        };

        let statements: Vec<String> = FRESH_INSTALL.iter().map(|s| s.to_string()).collect();
        let replacement_text = FRESH_INSTALL.join("\n");

        match case {
            CopyCase::MultiSource => {
                self.recommendations.push(
                    OptimizationAction::new(
                        RULE,
                        DOCKERFILE_NAME,
                        "Avoid copying node_modules into the final image",
                        "You seem to be copying node_modules into your final image.
Avoid this. Instead, perform a fresh dependency installation which excludes devDependencies (defined in your package.json).
Instead of \"COPY\", use something like \"RUN npm install --production\" / \"RUN yarn install --production\".",
                    )
                    .with_line(line),
                );
            }
            CopyCase::BuildContext if !multi_stage => {
                self.recommendations.push(
                    OptimizationAction::new(
                        RULE,
                        DOCKERFILE_NAME,
                        "Do not copy node_modules from your local system",
                        "You seem to be copying node_modules from your local system into the final image.
Avoid this. For your final image, always perform a fresh dependency installation which excludes devDependencies (defined in your package.json).
Create a new (final) stage in your Dockerfile, copy the built code into this stage and perform a fresh install of node_modules using \"npm install --production\" / \"yarn install --production\".",
                    )
                    .with_line(line),
                );
            }
            CopyCase::BuildContext => {
                self.dockerfile
                    .replace_layer_with_statements(target, &statements)
                    .expect("copy layer outlives classification");
                let line = self.dockerfile.layer(target).map(|l| l.line()).unwrap_or(line);

                self.actions_taken.push(
                    OptimizationAction::new(
                        RULE,
                        DOCKERFILE_NAME,
                        "Perform fresh install of node_modules in the final stage",
                        format!(
                            "In the last stage, the layer:
{old_text}
has been replaced by:
{replacement_text}
Copying node_modules from the local machine is not recommended.
A fresh install of production dependencies here ensures that the final image only contains modules needed for runtime, leaving out all devDependencies.",
                        ),
                    )
                    .with_line(line),
                );
            }
            CopyCase::FromOffendingStage(_) if !multi_stage => {
                // COPY --from referencing a previous stage of a
                // single-stage Dockerfile is semantically invalid; leave
                // it to the build to reject.
            }
            CopyCase::FromOffendingStage(source_name) => {
                self.dockerfile
                    .replace_layer_with_statements(target, &statements)
                    .expect("copy layer outlives classification");
                let line = self.dockerfile.layer(target).map(|l| l.line()).unwrap_or(line);

                self.actions_taken.push(
                    OptimizationAction::new(
                        RULE,
                        DOCKERFILE_NAME,
                        "Perform fresh install of node_modules in the final stage",
                        format!(
                            "In the last stage, the layer:
{old_text}
has been replaced by:
{replacement_text}
It seems that you're copying node_modules from a previous stage '{source_name}' which installs devDependencies as well.
So your final image would contain unnecessary packages.
Instead, a fresh installation of only production dependencies here ensures that the final image only contains modules needed for runtime, leaving out all devDependencies.",
                        ),
                    )
                    .with_line(line),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::ai::ScriptInvocation;

    const SINGLE_STAGE: &str = "FROM node:20\nWORKDIR /app\nCOPY . .\nRUN npm install\nCMD [\"node\", \"server.js\"]\n";

    struct StaticOracle(String);

    impl AiService for StaticOracle {
        fn add_multistage_builds(&self, _: &str, _: &[ScriptInvocation]) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    struct FailingOracle;

    impl AiService for FailingOracle {
        fn add_multistage_builds(&self, _: &str, _: &[ScriptInvocation]) -> Result<String> {
            anyhow::bail!("oracle unreachable")
        }
    }

    fn project(dockerfile: &str, dockerignore: Option<&str>, package_json: Option<&str>) -> Project {
        Project::new(
            Dockerfile::parse(dockerfile).unwrap(),
            Dockerignore::new(dockerignore.map(String::from)),
            package_json.map(|pj| PackageJson::parse(pj).unwrap()),
        )
    }

    fn assert_no_dev_deps_installed(dockerfile_text: &str) {
        let df = Dockerfile::parse(dockerfile_text).unwrap();
        assert!(
            helpers::stage_installs_dev_dependencies(df.final_stage()).is_none(),
            "final stage still installs dev dependencies:\n{dockerfile_text}"
        );
    }

    #[test]
    fn test_single_stage_without_oracle_only_recommends() {
        let report = project(SINGLE_STAGE, None, None).optimize(None);

        assert!(report.actions_taken.is_empty());
        assert_eq!(report.recommendations.len(), 2);

        let baseimage = &report.recommendations[0];
        assert_eq!(baseimage.rule, "final-stage-slim-baseimage");
        assert!(baseimage.description.contains("node:20-alpine"));

        let dev_deps = &report.recommendations[1];
        assert_eq!(dev_deps.rule, "exclude-devDependencies");
        // references the "RUN npm install" line
        assert_eq!(dev_deps.line, Some(4));

        // no automatic mutation, ignore file seeded
        assert_eq!(report.modified_project.dockerfile, SINGLE_STAGE);
        assert_eq!(
            report.modified_project.dockerignore,
            "node_modules\nnpm_debug.log\n.git\n"
        );
    }

    #[test]
    fn test_ignore_seeding_is_idempotent() {
        let seeded = "node_modules\nnpm_debug.log\n.git\n";
        let report = project(SINGLE_STAGE, Some(seeded), None).optimize(None);
        assert_eq!(report.modified_project.dockerignore, seeded);
    }

    #[test]
    fn test_multi_stage_dev_install_is_fixed() {
        let dockerfile = "FROM node:20 AS build\nWORKDIR /app\nCOPY . .\nRUN npm ci && npm run build\n\nFROM node:20-alpine\nWORKDIR /app\nCOPY --from=build /app/dist ./dist\nRUN npm ci\nCMD [\"node\", \"dist/main.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert_eq!(report.actions_taken.len(), 1);
        let action = &report.actions_taken[0];
        assert_eq!(action.rule, "exclude-devDependencies");
        assert!(action.description.contains("'npm ci --omit=dev'"));

        let modified = &report.modified_project.dockerfile;
        assert!(modified.contains("RUN npm ci --omit=dev"));
        // the build stage command is untouched
        assert!(modified.contains("RUN npm ci && npm run build"));

        // the recorded line points at the modified RUN statement
        let line = action.line.unwrap();
        let lines: Vec<&str> = modified.lines().collect();
        assert_eq!(lines[line - 1], "RUN npm ci --omit=dev");

        assert_no_dev_deps_installed(modified);
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_copy_of_node_modules_from_context_is_replaced() {
        let dockerfile = "FROM node:20 AS build\nWORKDIR /app\nCOPY . .\nRUN npm ci && npm run build\n\nFROM node:20-alpine\nWORKDIR /app\nCOPY node_modules ./node_modules\nCMD [\"node\", \"server.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert_eq!(report.actions_taken.len(), 1);
        let action = &report.actions_taken[0];
        assert_eq!(action.rule, "exclude-devDependencies");
        assert!(action.description.contains("COPY node_modules ./node_modules"));

        let modified = &report.modified_project.dockerfile;
        assert!(!modified.contains("COPY node_modules"));
        assert!(modified.contains("COPY package*.json ./\nRUN npm install --production"));
        assert_no_dev_deps_installed(modified);
    }

    #[test]
    fn test_copy_of_node_modules_from_offending_stage_is_replaced() {
        let dockerfile = "FROM node:20 AS deps\nWORKDIR /app\nCOPY package*.json ./\nRUN npm install\n\nFROM node:20-alpine\nWORKDIR /app\nCOPY --from=deps /app/node_modules ./node_modules\nCOPY . .\nCMD [\"node\", \"server.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert_eq!(report.actions_taken.len(), 1);
        let action = &report.actions_taken[0];
        assert!(action.description.contains("previous stage 'deps'"));

        let modified = &report.modified_project.dockerfile;
        assert!(!modified.contains("COPY --from=deps /app/node_modules"));
        assert_no_dev_deps_installed(modified);
    }

    #[test]
    fn test_copy_from_clean_stage_is_left_alone() {
        let dockerfile = "FROM node:20 AS deps\nCOPY package*.json ./\nRUN npm ci --omit=dev\n\nFROM node:20-alpine\nCOPY --from=deps /app/node_modules ./node_modules\nCMD [\"node\", \"server.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert!(report.actions_taken.is_empty());
        assert!(report.recommendations.is_empty());
        assert_eq!(report.modified_project.dockerfile, dockerfile);
    }

    #[test]
    fn test_copy_from_external_image_is_left_alone() {
        let dockerfile = "FROM node:20 AS build\nRUN npm ci --omit=dev\n\nFROM node:20-alpine\nCOPY --from=some-image:1.2 /opt/node_modules ./node_modules\nCMD [\"node\", \"server.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert!(report.actions_taken.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn test_multi_source_copy_only_recommends() {
        let dockerfile = "FROM node:20 AS build\nRUN npm ci --omit=dev\n\nFROM node:20-alpine\nCOPY src node_modules /app/\nCMD [\"node\", \"server.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert!(report.actions_taken.is_empty());
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].rule, "exclude-devDependencies");
        // the layer is untouched
        assert!(report.modified_project.dockerfile.contains("COPY src node_modules /app/"));
    }

    #[test]
    fn test_full_runtime_final_base_image_is_lightened() {
        let dockerfile = "FROM node:20 AS build\nWORKDIR /app\nRUN npm ci --omit=dev\n\nFROM node:20\nCOPY --from=build /app /app\nCMD [\"node\", \"server.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert_eq!(report.actions_taken.len(), 1);
        assert_eq!(report.actions_taken[0].rule, "final-stage-slim-baseimage");
        assert!(report.modified_project.dockerfile.contains("FROM node:20-alpine"));
        // the build stage keeps the full image
        assert!(report.modified_project.dockerfile.contains("FROM node:20 AS build"));
    }

    #[test]
    fn test_non_node_final_base_image_prefers_node_alpine() {
        let dockerfile = "FROM node:20 AS build\nRUN npm ci --omit=dev\n\nFROM ubuntu:22.04\nCOPY --from=build /app /app\nCMD [\"node\", \"server.js\"]\n";
        let report = project(dockerfile, None, None).optimize(None);

        assert_eq!(report.actions_taken.len(), 1);
        assert!(report.modified_project.dockerfile.contains("FROM node:alpine"));
    }

    #[test]
    fn test_oracle_rewrite_is_accepted_and_rules_follow() {
        let rewritten = "FROM node:20 AS build\nWORKDIR /app\nCOPY . .\nRUN npm install\nRUN npm run build\n\nFROM node:20-alpine\nWORKDIR /app\nENV NODE_ENV=production\nCOPY package*.json ./\nRUN npm install --production\nCOPY --from=build /app/dist ./dist\nCMD [\"node\", \"dist/main.js\"]\n";
        let oracle = StaticOracle(rewritten.to_string());

        let report = project(SINGLE_STAGE, None, None).optimize(Some(&oracle));

        assert_eq!(report.actions_taken.len(), 1);
        assert_eq!(report.actions_taken[0].rule, "use-multistage-builds");
        // the deterministic rules ran on the new recipe and found it clean
        assert!(report.recommendations.is_empty());
        assert_eq!(report.modified_project.dockerfile, rewritten);
    }

    #[test]
    fn test_oracle_not_consulted_for_multi_stage() {
        let dockerfile = "FROM node:20 AS build\nRUN npm ci --omit=dev\n\nFROM node:20-alpine\nCOPY --from=build /app /app\nCMD [\"node\", \"server.js\"]\n";
        let oracle = StaticOracle("FROM scratch\nFROM scratch\n".to_string());
        let report = project(dockerfile, None, None).optimize(Some(&oracle));

        assert!(report.actions_taken.is_empty());
        assert_eq!(report.modified_project.dockerfile, dockerfile);
    }

    #[test]
    fn test_oracle_failure_downgrades_to_recommendation() {
        let report = project(SINGLE_STAGE, None, None).optimize(Some(&FailingOracle));

        assert!(report.actions_taken.is_empty());
        assert_eq!(report.recommendations[0].rule, "use-multistage-builds");
        // the original recipe is preserved and the other rules still ran
        assert_eq!(report.modified_project.dockerfile, SINGLE_STAGE);
        let rules: Vec<&str> = report.recommendations.iter().map(|r| r.rule).collect();
        assert_eq!(
            rules,
            vec![
                "use-multistage-builds",
                "final-stage-slim-baseimage",
                "exclude-devDependencies"
            ]
        );
    }

    #[test]
    fn test_oracle_malformed_output_downgrades_to_recommendation() {
        let oracle = StaticOracle("sorry, I cannot help with that".to_string());
        let report = project(SINGLE_STAGE, None, None).optimize(Some(&oracle));

        assert!(report.actions_taken.is_empty());
        assert_eq!(report.recommendations[0].rule, "use-multistage-builds");
        assert_eq!(report.modified_project.dockerfile, SINGLE_STAGE);
    }

    #[test]
    fn test_oracle_single_stage_output_is_refused() {
        let oracle = StaticOracle("FROM node:20-alpine\nRUN npm ci --omit=dev\n".to_string());
        let report = project(SINGLE_STAGE, None, None).optimize(Some(&oracle));

        assert!(report.actions_taken.is_empty());
        assert_eq!(report.recommendations[0].rule, "use-multistage-builds");
        assert_eq!(report.modified_project.dockerfile, SINGLE_STAGE);
    }

    #[test]
    fn test_report_serialization_shape() {
        let report = project(SINGLE_STAGE, None, Some(r#"{"name": "app"}"#)).optimize(None);
        let json = serde_json::to_value(&report).unwrap();

        assert!(json["actions_taken"].is_array());
        assert!(json["recommendations"].is_array());
        let modified = &json["modified_project"];
        assert!(modified["Dockerfile"].is_string());
        assert!(modified[".dockerignore"].is_string());
        assert_eq!(modified["package.json"], r#"{"name": "app"}"#);

        // package.json is omitted entirely when no manifest was given
        let report = project(SINGLE_STAGE, None, None).optimize(None);
        let json = serde_json::to_value(&report).unwrap();
        assert!(json["modified_project"].get("package.json").is_none());
    }
}
