/*!
 * Common test utilities for the mdtrans test suite
 */

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;

use mdtrans::backends::mock::{MockModelFactory, MockTranslationModel};
use mdtrans::config::TranslationConfig;
use mdtrans::mt::MtTranslator;
use mdtrans::pipeline::TranslationPipeline;
use mdtrans::postedit::LlmPostEditor;
use mdtrans::registry::{Backend, ModelRegistry, ModelSpec};

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &PathBuf, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// A sample Markdown document exercising most block kinds
pub fn sample_document() -> &'static str {
    r#"---
title: Sample
---

# Heading One

A paragraph with a [link](https://example.com/page) and the number 42.

- First item
- Second item
  with a continuation line

> A quoted thought
> spanning two lines

```rust
fn main() { println!("untouched"); }
```

Closing paragraph with `inline code` and https://example.org.
"#
}

/// Registry with a single en->de Marian model
pub fn single_pair_registry() -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::new(vec![ModelSpec::new(
        "m-en-de",
        "en",
        "de",
        Backend::Marian,
    )]))
}

/// Pipeline over a mock MT model and offline post-editor for en->de
pub fn mock_pipeline(model: MockTranslationModel) -> TranslationPipeline {
    let mt = MtTranslator::new(single_pair_registry(), Box::new(MockModelFactory::new(model)));
    TranslationPipeline::new(mt, LlmPostEditor::offline())
}

/// Default en->de configuration
pub fn en_de_config() -> TranslationConfig {
    TranslationConfig::new("en", "de")
}
