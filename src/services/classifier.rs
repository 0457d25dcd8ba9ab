//! Tag classification through a remote text-generation model.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::Error;
use crate::models::{Tags, INSUFFICIENT_INFO, MAX_TAGS, TAG_DELIMITER};
use crate::traits::{GenerationRequest, TextGenerationClient};

/// Builds the classification prompt and turns model output into [`Tags`].
pub struct TagClassifier {
    client: Arc<dyn TextGenerationClient>,
    model: Option<String>,
}

impl TagClassifier {
    pub fn new(client: Arc<dyn TextGenerationClient>) -> Self {
        Self {
            client,
            model: None,
        }
    }

    /// Override the client's default model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Classify one application.
    ///
    /// Remote failures are logged and reported as insufficient information;
    /// this never fails.
    pub async fn classify(&self, name: &str, package: &str) -> Tags {
        info!("Requesting tags for '{}' ({})", name, package);
        let request = GenerationRequest {
            prompt: Self::build_prompt(name, package),
            model: self.model.clone(),
            temperature: Some(0.0),
        };

        match self.client.generate(request).await {
            Ok(response) => {
                debug!("Raw tags for {}: {:?}", package, response.text);
                Tags::parse(&response.text)
            }
            Err(e) => {
                let err = Error::Classification {
                    package: package.to_string(),
                    reason: format!("{e:#}"),
                };
                warn!("{}; treating as '{}'", err, INSUFFICIENT_INFO);
                Tags::InsufficientInformation
            }
        }
    }

    /// The instruction sent for one application. Depends only on its inputs.
    pub fn build_prompt(name: &str, package: &str) -> String {
        format!(
            r#"# Role
You are a senior Android application analyst who identifies the core function of an app and describes it as a short list of feature tags.

# Task and rules
From the application name and package name below, determine the app's core function and produce tags. Follow every rule:

1. Content: each tag is a short keyword or phrase summarising a core function of the app.
2. Count: return 3 to {max} of the most relevant tags. Single-purpose apps may have fewer than 3, never more than {max}.
3. Format: separate tags with a comma (`{delim}`), for example: "tag1{delim}tag2{delim}tag3".
4. Purity: output nothing but the tags. No explanations, introductions, numbering, bullet points or any other text. The answer must be directly machine-parseable.
5. Language: write every tag in English.

## Examples

### Example 1
- Input:
  - App name: "微信"
  - Package: "com.tencent.mm"
- Expected output:
social{delim}instant messaging{delim}payments{delim}mini programs

### Example 2
- Input:
  - App name: "楽天市場"
  - Package: "jp.co.rakuten.android"
- Expected output:
online shopping{delim}e-commerce{delim}reward points{delim}lifestyle services

### Example 3
- Input:
  - App name: "原神"
  - Package: "com.miHoYo.Yuanshen"
- Expected output:
open world{delim}role-playing{delim}action game{delim}anime style

### Example 4
- Input:
  - App name: "メルカリ" (Mercari)
  - Package: "jp.mercari.android"
- Expected output:
second-hand trading{delim}flea market{delim}C2C e-commerce{delim}online payments

## When you cannot tell
If you cannot find reliable information about the app or cannot determine its core function:
- Do not guess or invent anything.
- Answer with exactly the following text and nothing else:
{sentinel}

# Begin
Generate tags for this application:

- App name: "{name}"
- Package: "{package}"
"#,
            max = MAX_TAGS,
            delim = TAG_DELIMITER,
            sentinel = INSUFFICIENT_INFO,
            name = name,
            package = package,
        )
    }
}
