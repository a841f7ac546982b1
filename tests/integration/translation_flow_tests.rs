/*!
 * End-to-end document translation tests over mock backends
 */

use std::collections::BTreeMap;
use std::sync::Arc;

use mdtrans::backends::mock::{MockChatModel, MockModelFactory, MockTranslationModel};
use mdtrans::backends::ChatModel;
use mdtrans::config::BackendPolicy;
use mdtrans::diagnostics::{CollectingSink, DiagnosticEvent, DiagnosticSink, Stage};
use mdtrans::mt::MtTranslator;
use mdtrans::pipeline::TranslationPipeline;
use mdtrans::postedit::{LlmPostEditor, PostEditOptions};
use mdtrans::registry::{Backend, ModelRegistry, ModelSpec};
use mdtrans::segmenter::MarkdownSegmenter;

use crate::common::{en_de_config, mock_pipeline, sample_document, single_pair_registry};

#[tokio::test]
async fn test_translate_withIdentityMt_shouldReturnDocumentUnchanged() {
    let pipeline = mock_pipeline(MockTranslationModel::echo());

    let result = pipeline
        .translate(sample_document(), &en_de_config())
        .await
        .unwrap();

    assert_eq!(result, sample_document());
}

#[tokio::test]
async fn test_translate_shouldNeverTouchCodeBlocksOrFrontmatter() {
    let pipeline = mock_pipeline(MockTranslationModel::tagged("[MT]"));

    let result = pipeline
        .translate(sample_document(), &en_de_config())
        .await
        .unwrap();

    assert!(result.contains("fn main() { println!(\"untouched\"); }"));
    assert!(result.contains("title: Sample"));
    assert!(result.contains("[MT]"));
}

#[tokio::test]
async fn test_translate_shouldPreserveLinksAndNumbersThroughTranslation() {
    let pipeline = mock_pipeline(MockTranslationModel::replacing(&[
        ("paragraph", "Absatz"),
        ("number", "Zahl"),
    ]));
    let segmenter = MarkdownSegmenter::new();

    let result = pipeline
        .translate(sample_document(), &en_de_config())
        .await
        .unwrap();

    assert_eq!(
        segmenter.extract_links(sample_document()).len(),
        segmenter.extract_links(&result).len()
    );
    assert!(result.contains("https://example.com/page"));
    assert!(result.contains("42"));
    assert!(result.contains("Absatz"));
}

#[tokio::test]
async fn test_translate_withMisbehavingPostEditor_shouldFallBackToMtDraft() {
    let chat = Arc::new(MockChatModel::new());
    // Both attempts drop the placeholder tokens
    chat.push_response("completely rewritten without tokens");
    chat.push_response("still no tokens here");
    let mt = MtTranslator::new(
        single_pair_registry(),
        Box::new(MockModelFactory::new(MockTranslationModel::echo())),
    );
    let sink = Arc::new(CollectingSink::new());
    let pipeline = TranslationPipeline::new(
        mt,
        LlmPostEditor::new(chat, PostEditOptions::default()),
    )
    .with_sink(Arc::clone(&sink) as Arc<dyn DiagnosticSink>);

    let text = "A sentence with `code` inside.\n";
    let result = pipeline.translate(text, &en_de_config()).await.unwrap();

    assert_eq!(result, text);
    assert!(sink.events().iter().any(|e| matches!(
        e,
        DiagnosticEvent::PosteditFallback { block_index: 0, .. }
    )));
}

#[tokio::test]
async fn test_translate_withKeepGlossaryTerm_shouldPinTermEndToEnd() {
    let chat = Arc::new(MockChatModel::new());
    chat.push_response("Die SaaS Plattform ist großartig.");
    let mt = MtTranslator::new(
        single_pair_registry(),
        Box::new(MockModelFactory::new(MockTranslationModel::echo())),
    );
    let pipeline = TranslationPipeline::new(
        mt,
        LlmPostEditor::new(chat, PostEditOptions::default()),
    );
    let mut glossary = BTreeMap::new();
    glossary.insert("SaaS".to_string(), "KEEP".to_string());
    let cfg = en_de_config().with_glossary(glossary);

    let result = pipeline
        .translate("The SaaS platform is great.\n", &cfg)
        .await
        .unwrap();

    assert!(result.contains("SaaS"));
}

#[tokio::test]
async fn test_translate_shouldEmitOneValidationRecordPerStage() {
    let sink = Arc::new(CollectingSink::new());
    let pipeline = mock_pipeline(MockTranslationModel::echo())
        .with_sink(Arc::clone(&sink) as Arc<dyn DiagnosticSink>);

    pipeline
        .translate("One paragraph only.\n", &en_de_config())
        .await
        .unwrap();

    let stages: Vec<Stage> = sink
        .events()
        .iter()
        .filter_map(|e| match e {
            DiagnosticEvent::StageValidated { stage, .. } => Some(*stage),
            _ => None,
        })
        .collect();

    // Identity MT passes first time: no retry stage
    assert_eq!(stages, vec![Stage::Mt, Stage::Postedit]);
}

#[tokio::test]
async fn test_translate_withNllbOnlyPolicy_shouldUseFallbackModel() {
    let factory = MockModelFactory::new(MockTranslationModel::echo());
    let model = factory.model();
    let registry = Arc::new(ModelRegistry::new(vec![ModelSpec::new(
        "m-en-de",
        "en",
        "de",
        Backend::Marian,
    )]));
    let mt = MtTranslator::new(registry, Box::new(factory));
    let pipeline = TranslationPipeline::new(mt, LlmPostEditor::offline());
    let cfg = en_de_config().with_backend(BackendPolicy::NllbOnly);

    let result = pipeline.translate("Hello world.\n", &cfg).await.unwrap();

    assert_eq!(result, "Hello world.\n");
    assert_eq!(model.call_count(), 1);
}

#[tokio::test]
async fn test_reconstructChecked_withDroppedBlock_shouldRaiseStructuralError() {
    let pipeline = mock_pipeline(MockTranslationModel::echo());
    let blocks = pipeline.segmenter().segment(sample_document());

    let mut truncated = pipeline
        .translate_blocks(&blocks, &en_de_config())
        .await
        .unwrap();
    truncated.pop();

    let result = pipeline.reconstruct_checked(&blocks, &truncated);

    assert!(matches!(
        result,
        Err(mdtrans::errors::PipelineError::StructuralIntegrity { .. })
    ));
}

#[tokio::test]
async fn test_prefetchPair_withFailingMarianModels_shouldDowngradeToNllb() {
    let factory = MockModelFactory::new(MockTranslationModel::echo()).with_failing_marian_warm_up();
    let mt = MtTranslator::new(single_pair_registry(), Box::new(factory));
    let cfg = en_de_config();

    let effective = mt.prefetch_pair(&cfg).await.unwrap();

    assert_eq!(effective, BackendPolicy::NllbOnly);
}

#[tokio::test]
async fn test_prefetchPair_withMarianOnlyPolicy_shouldNotDowngrade() {
    let factory = MockModelFactory::new(MockTranslationModel::echo()).with_failing_marian_warm_up();
    let mt = MtTranslator::new(single_pair_registry(), Box::new(factory));
    let cfg = en_de_config().with_backend(BackendPolicy::MarianOnly);

    assert!(mt.prefetch_pair(&cfg).await.is_err());
}

#[tokio::test]
async fn test_translate_withOversizedPostEditPrompt_shouldSkipStrictRetry() {
    let chat = Arc::new(MockChatModel::new());
    let mt = MtTranslator::new(
        single_pair_registry(),
        Box::new(MockModelFactory::new(MockTranslationModel::echo())),
    );
    let sink = Arc::new(CollectingSink::new());
    let pipeline = TranslationPipeline::new(
        mt,
        LlmPostEditor::new(
            Arc::clone(&chat) as Arc<dyn ChatModel>,
            PostEditOptions {
                max_prompt_chars: Some(20),
                ..PostEditOptions::default()
            },
        ),
    )
    .with_sink(Arc::clone(&sink) as Arc<dyn DiagnosticSink>);

    let text = "A paragraph too long for the prompt budget.\n";
    let result = pipeline.translate(text, &en_de_config()).await.unwrap();

    // The MT draft is used and the model is never called, not even once
    // for the strict retry.
    assert_eq!(result, text);
    assert_eq!(chat.call_count(), 0);
    assert!(sink.events().iter().any(|e| matches!(
        e,
        DiagnosticEvent::PosteditFallback { .. }
    )));
}

#[test]
fn test_translate_withSyncCaller_shouldCompleteViaBlockOn() {
    let pipeline = mock_pipeline(MockTranslationModel::echo());

    let result = tokio_test::block_on(pipeline.translate("Plain text.\n", &en_de_config()));

    assert_eq!(result.unwrap(), "Plain text.\n");
}

#[tokio::test]
async fn test_prefetch_withFailingWarmUp_shouldSurfaceError() {
    let factory = MockModelFactory::new(MockTranslationModel::echo().with_failing_warm_up());
    let registry = single_pair_registry();
    let mt = MtTranslator::new(Arc::clone(&registry), Box::new(factory));
    let steps = registry
        .route("en", "de", true, BackendPolicy::MarianThenNllb)
        .unwrap();

    assert!(mt.prefetch(&steps).await.is_err());
}

#[tokio::test]
async fn test_prefetch_withHealthyBackend_shouldSucceed() {
    let factory = MockModelFactory::new(MockTranslationModel::echo());
    let registry = single_pair_registry();
    let mt = MtTranslator::new(Arc::clone(&registry), Box::new(factory));
    let steps = registry
        .route("en", "de", true, BackendPolicy::MarianThenNllb)
        .unwrap();

    assert!(mt.prefetch(&steps).await.is_ok());
}
