//! Cluster relabeling: persistence, failure handling and concurrent readers.

use ipaflow::{
    Config, Engine, IpaError, MappingService, MemoryStore, PhoneToken, RuleEngine, Segment,
    SymbolRegistry, Utterance,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn cluster_utterance(id: &str, language: &str, cluster: &str) -> Utterance {
    Utterance {
        utterance_id: id.to_string(),
        language: Some(language.to_string()),
        notation: None,
        segments: vec![Segment {
            segment_id: 0,
            utterance_id: id.to_string(),
            tokens: vec![PhoneToken::cluster(cluster, 0, 100, 1.0)],
            prosody: Vec::new(),
            syllables: Vec::new(),
        }],
    }
}

fn engine_with_store(store: MemoryStore) -> Engine {
    let registry = Arc::new(SymbolRegistry::builtin().unwrap());
    let rules = RuleEngine::builtin(Arc::clone(&registry));
    let mappings = Arc::new(MappingService::new(Box::new(store)));
    Engine::new(Config::default(), registry, rules, mappings)
}

#[test]
fn test_relabel_persists_across_engines() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.mapping.store_dir = Some(dir.path().join("mappings"));

    let first = Engine::from_config(config.clone()).unwrap();
    first.relabel("C17", "tlh", "q", None).unwrap();
    let expected = first
        .process(&cluster_utterance("u1", "tlh", "C17"))
        .unwrap()
        .ipa();
    assert_eq!(expected, "q");
    assert!(dir.path().join("mappings").join("tlh.json").exists());

    let second = Engine::from_config(config).unwrap();
    let reloaded = second
        .process(&cluster_utterance("u1", "tlh", "C17"))
        .unwrap()
        .ipa();
    assert_eq!(reloaded, expected);
}

#[test]
fn test_unknown_language_relabel_goes_global() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.mapping.store_dir = Some(dir.path().to_path_buf());
    let engine = Engine::from_config(config).unwrap();

    engine.relabel("C9", "", "s", None).unwrap();

    assert!(dir.path().join("_global.json").exists());
    // Every language falls back to the global partition.
    let transcript = engine.process(&cluster_utterance("u1", "fr", "C9")).unwrap();
    assert_eq!(transcript.ipa(), "s");
}

#[test]
fn test_failed_save_reported_but_applied_in_memory() {
    let store = MemoryStore::new();
    store.set_fail_saves(true);
    let engine = engine_with_store(store);

    let result = engine.relabel("C2", "en", "s", None);

    assert!(matches!(
        result,
        Err(IpaError::MappingPersistenceFailure { .. })
    ));
    let transcript = engine.process(&cluster_utterance("u1", "en", "C2")).unwrap();
    assert_eq!(transcript.ipa(), "s");
}

#[test]
fn test_latest_relabel_wins_as_primary() {
    let engine = engine_with_store(MemoryStore::new());
    engine.relabel("C5", "en", "s", None).unwrap();
    engine.relabel("C5", "en", "z", None).unwrap();

    let transcript = engine.process(&cluster_utterance("u1", "en", "C5")).unwrap();
    assert_eq!(transcript.glyphs[0].symbol, "z");
}

#[test]
fn test_readers_never_see_partial_relabel() {
    let engine = engine_with_store(MemoryStore::new());
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for reader in 0..4 {
            let engine = &engine;
            let done = &done;
            scope.spawn(move || {
                let input = cluster_utterance(&format!("r{reader}"), "en", "C17");
                while !done.load(Ordering::Acquire) {
                    let transcript = engine.process(&input).unwrap();
                    let symbol = transcript.glyphs[0].symbol.as_str();
                    assert!(
                        ["◯", "s", "ʃ"].contains(&symbol),
                        "unexpected symbol {symbol}"
                    );
                }
            });
        }

        for i in 0..200 {
            let symbol = if i % 2 == 0 { "s" } else { "ʃ" };
            engine.relabel("C17", "en", symbol, None).unwrap();
        }
        done.store(true, Ordering::Release);
    });

    let labels = engine.mapper().service().labels("en", "C17");
    let votes: u32 = labels.iter().map(|l| l.votes).sum();
    assert_eq!(votes, 200);
}
