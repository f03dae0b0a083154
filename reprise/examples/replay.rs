//! Record one simulated execution, then serve it back from the cache.
//!
//! `cargo run --example replay`

extern crate env_logger;

use async_trait::async_trait;
use reprise::{
    build_config_signature, Action, ActionExecutor, AgentCache, AgentOptions, AgentResult,
    AgentUsage, CacheResult, ExecuteOptions, ExecutionResult, PageHandle, Point, ReplayStep,
    Viewport, WaitUntil,
};
use std::sync::Arc;

struct DemoPage;

#[async_trait]
impl PageHandle for DemoPage {
    async fn current_url(&self) -> String {
        "https://demo.example/login".into()
    }

    async fn goto(&self, url: &str, _wait_until: WaitUntil) -> CacheResult<()> {
        println!("page: goto {url}");
        Ok(())
    }

    async fn scroll(&self, _anchor: Point, _delta_x: f64, delta_y: f64) -> CacheResult<()> {
        println!("page: scroll by {delta_y}");
        Ok(())
    }

    async fn type_text(&self, text: &str) -> CacheResult<()> {
        println!("page: type {text:?}");
        Ok(())
    }

    async fn press_keys(&self, keys: &[String]) -> CacheResult<()> {
        println!("page: press {}", keys.join("+"));
        Ok(())
    }

    async fn back(&self, _wait_until: WaitUntil) -> CacheResult<()> {
        println!("page: back");
        Ok(())
    }

    async fn viewport(&self) -> Option<Viewport> {
        Some(Viewport {
            width: 1280.0,
            height: 720.0,
        })
    }
}

struct DemoExecutor;

#[async_trait]
impl ActionExecutor for DemoExecutor {
    async fn execute(&self, _page: &dyn PageHandle, action: &Action) -> ExecutionResult {
        println!("executor: {} on {}", action.method, action.selector);
        ExecutionResult::success(Vec::new())
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cache_dir = std::env::temp_dir().join("reprise-demo");
    let cache = Arc::new(
        AgentCache::builder()
            .with_cache_dir(&cache_dir)
            .with_executor(Arc::new(DemoExecutor))
            .build(),
    );
    let page = DemoPage;

    let signature = build_config_signature(
        &AgentOptions::new("computer-use-latest").with_system_prompt("Operate carefully."),
    );
    let options = ExecuteOptions::new().with_max_steps(10);
    let context = cache
        .prepare_context("log in with the demo account", &options, &signature, Some(&page))
        .await
        .expect("instruction is not empty");

    if let Some(result) = cache.try_replay(&context, None, Some(&page)).await {
        println!(
            "cache hit (recorded {}): {}",
            result.metadata.cache_timestamp.as_deref().unwrap_or("?"),
            result.message
        );
        return;
    }

    // Simulate the live run the agent would perform on a miss.
    println!("cache miss, running live");
    let steps = vec![
        ReplayStep::goto("https://demo.example/login"),
        ReplayStep::fill_form(vec![
            Action::new("#user", "fill")
                .with_description("Username")
                .with_arguments(vec![serde_json::json!("demo")]),
            Action::new("#pass", "fill")
                .with_description("Password")
                .with_arguments(vec![serde_json::json!("demo")]),
        ]),
        ReplayStep::act("press the login button", vec![Action::new("#go", "click")]),
    ];
    let result = AgentResult::success("Logged in as demo")
        .with_usage(AgentUsage::new(640, 180))
        .with_completed(true);
    cache.store(&context, steps, &result).await;
    println!("recorded to {}", cache_dir.display());
    println!("run again to replay from cache");
}
