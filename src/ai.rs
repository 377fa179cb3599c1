use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

/// A script invoked from the Dockerfile, with the commands it maps to in
/// package.json. Shared with the model so it understands the build.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptInvocation {
    pub command: String,
    pub script_contents: String,
}

/// The language-model oracle behind the multistage rewrite rule.
///
/// A single narrow method: given the current Dockerfile and the scripts
/// it invokes, return a complete multistage Dockerfile as text. Any
/// failure is contained at the rule boundary.
pub trait AiService {
    fn add_multistage_builds(
        &self,
        dockerfile: &str,
        scripts: &[ScriptInvocation],
    ) -> Result<String>;
}

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const DEFAULT_MODEL: &str = "gpt-4o";

// Low temperature: we want deterministic, fact-based rewrites.
const TEMPERATURE: f32 = 0.2;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

const SYSTEM_PROMPT: &str = r#"You are an expert software and DevOps engineer who specializes in Docker and NodeJS backend applications.

Given a Nodejs project that contains a Docker image definition to containerize it, your goal is to reduce the size of the docker image as much as possible, while still keeping the code legible and developer-friendly.

As part of this request, your only task is to modify the given single-stage Dockerfile to adopt Multistage builds. Multistage has the benefit that the final image produced (final stage) uses a slim base image and only contains things that you put in it.
Create a final stage in the Dockerfile which only contains the application source code, its dependencies (excluding "devDependencies" from package.json) and anything else you think is necessary for the app to run or relevant to the final image.

* The final stage must use a slim base image if possible. If the previous stage uses a specific version of NodeJS, make sure to use the same version.
* If possible, set the `NODE_ENV` environment variable to `production`. This should be done BEFORE running any commands related to nodejs or npm. This ensures that dev dependencies are not installed in the final stage.
* Do a fresh install of the dependencies (node_modules) in the final stage and exclude dev dependencies. Do not change the installation commands in the previous stage and don't copy node_modules from the previous stage.
* Try to keep your code changes as consistent with the original code as possible. For example, if the previous stage uses "npm install" for installing dependencies, don't replace it with "npm ci". Try to use "install" only.
* If the previous stage contains some metadata such as LABEL statements, make sure to include them in the final stage as well, if you think its relevant.
* Comments should be added only in the new stage that you're writing. Don't add any comments in the previous stage unless you need to make an important remark.
* If the previous stage contains any `RUN` statements invoking any scripts like `npm run build`, the commands in this script will also be shared with you so you can understand its behaviour.

After writing all the code, review it step-by-step and think what the final image would contain to ensure you didn't accidentally leave out anything important.

As your response, output only the new Dockerfile, nothing else."#;

/// OpenAI-compatible chat-completions client.
pub struct OpenAiService {
    client: reqwest::blocking::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiService {
    pub fn new(api_key: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.to_string(),
            model: DEFAULT_MODEL.to_string(),
        })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

impl AiService for OpenAiService {
    fn add_multistage_builds(
        &self,
        dockerfile: &str,
        scripts: &[ScriptInvocation],
    ) -> Result<String> {
        let user_prompt = build_user_prompt(dockerfile, scripts)?;

        let request = ChatRequest {
            model: &self.model,
            temperature: TEMPERATURE,
            messages: vec![
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: &user_prompt,
                },
            ],
        };

        tracing::debug!(model = %self.model, scripts = scripts.len(), "requesting multistage rewrite");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .context("sending chat completion request")?
            .error_for_status()
            .context("chat completion request failed")?;

        let response: ChatResponse = response.json().context("decoding chat completion response")?;
        let Some(choice) = response.choices.into_iter().next() else {
            bail!("chat completion response contains no choices");
        };

        Ok(strip_code_fences(&choice.message.content))
    }
}

fn build_user_prompt(dockerfile: &str, scripts: &[ScriptInvocation]) -> Result<String> {
    let mut prompt = format!("Optimize this Dockerfile:\n\n```\n{dockerfile}\n```\n");
    if !scripts.is_empty() {
        let details =
            serde_json::to_string_pretty(scripts).context("serializing script details")?;
        prompt.push_str(&format!("\n-- Additional Details --\n\n{details}\n"));
    }
    Ok(prompt)
}

/// Strip a surrounding markdown code fence from a model reply, if any.
///
/// eg- gpt-4o tends to wrap the Dockerfile in "```dockerfile ... ```".
fn strip_code_fences(reply: &str) -> String {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };

    // drop the rest of the opening fence line (the language tag)
    let body = match rest.split_once('\n') {
        Some((_lang, body)) => body,
        None => rest,
    };
    let body = body.strip_suffix("```").unwrap_or(body);
    body.trim().to_string()
}
