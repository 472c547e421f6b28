use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::{sync::mpsc, task::JoinHandle, task::JoinSet};
use tracing::{debug, instrument, warn};

use crate::Logged;

use super::{
    DataFrame, GazetteerCache, MatcherRegistry, TransformError, Transformation,
    TransformerRegistry,
};

/**
 * One entry of a transformation chain, e.g. `{"id": "limit", "options": {"limitField": 5}}`
 */
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformerConfig {
    pub id: String,

    #[serde(default)]
    pub options: serde_json::Value,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,
}

impl TransformerConfig {
    pub fn new<T>(id: T, options: serde_json::Value) -> Self
    where
        T: ToString,
    {
        Self {
            id: id.to_string(),
            options,
            disabled: false,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }
}

/**
 * Registries and shared state used while building a pipeline
 */
#[derive(Clone, Debug)]
pub struct BuildContext {
    pub transformers: TransformerRegistry,
    pub matchers: MatcherRegistry,
    pub gazetteers: Arc<GazetteerCache>,
}

impl BuildContext {
    pub fn new(
        transformers: TransformerRegistry,
        matchers: MatcherRegistry,
        gazetteers: Arc<GazetteerCache>,
    ) -> Self {
        Self {
            transformers,
            matchers,
            gazetteers,
        }
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new(
            TransformerRegistry::with_standard_transformers(),
            MatcherRegistry::with_standard_matchers(),
            Default::default(),
        )
    }
}

/**
 * One transformation stage
 */
#[derive(Debug)]
pub struct Stage {
    /**
     * The id of the transformer that built this stage
     */
    pub id: String,

    pub transformation: Box<dyn Transformation>,
}

/**
 * A transformation pipeline, stages are applied in order
 */
#[derive(Debug, Default)]
pub struct Pipeline {
    pub stages: Vec<Stage>,
}

impl Pipeline {
    /**
     * Resolve and validate every enabled entry, the first configuration error aborts the build
     */
    pub fn build(configs: &[TransformerConfig], ctx: &BuildContext) -> Result<Self, TransformError> {
        let stages = configs
            .iter()
            .filter(|c| !c.disabled)
            .map(|c| {
                let definition = ctx.transformers.get(&c.id)?;
                Ok(Stage {
                    id: c.id.clone(),
                    transformation: definition.create(&c.options, ctx)?,
                })
            })
            .collect::<Result<Vec<_>, TransformError>>()
            .log()?;
        debug!(
            "Pipeline built with {} stages, {} disabled",
            stages.len(),
            configs.len() - stages.len()
        );
        Ok(Self { stages })
    }

    /**
     * Build a pipeline from the JSON array form of the configuration
     */
    pub fn parse(json: &str, ctx: &BuildContext) -> Result<Self, TransformError> {
        let configs: Vec<TransformerConfig> = serde_json::from_str(json)?;
        Self::build(&configs, ctx)
    }

    /**
     * Apply all stages synchronously, `prepare` must have been called if any stage needs external resources
     */
    pub fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        let mut current = frames.to_vec();
        for stage in &self.stages {
            debug!("Applying stage '{}' to {} frames", stage.id, current.len());
            current = stage.transformation.apply(&current).log()?;
        }
        Ok(current)
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn prepare(&self) -> Result<(), TransformError> {
        for stage in &self.stages {
            stage.transformation.prepare().await.log()?;
        }
        Ok(())
    }

    /**
     * Prepare all stages then apply them
     */
    pub async fn process(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
        self.prepare().await?;
        self.apply(frames)
    }

    /**
     * Run the pipeline over every batch of the input stream.
     * A newer batch supersedes the one still being processed, its result is never emitted.
     * The first error ends the output stream, dropping the output stream stops all in-flight work.
     */
    pub fn process_stream<S>(self: Arc<Self>, input: S) -> FrameStream
    where
        S: Stream<Item = Vec<DataFrame>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel(16);
        let driver = tokio::spawn(async move {
            let mut input = Box::pin(input);
            let mut in_flight: JoinSet<(u64, Result<Vec<DataFrame>, TransformError>)> =
                JoinSet::new();
            let mut input_done = false;
            let mut generation = 0u64;
            loop {
                tokio::select! {
                    batch = input.next(), if !input_done => match batch {
                        Some(frames) => {
                            if !in_flight.is_empty() {
                                debug!("New batch arrived, aborting {} in-flight tasks", in_flight.len());
                            }
                            in_flight.abort_all();
                            generation += 1;
                            let current = generation;
                            let pipeline = self.clone();
                            in_flight.spawn(async move { (current, pipeline.process(&frames).await) });
                        }
                        None => input_done = true,
                    },
                    Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => match joined {
                        Ok((g, result)) if g == generation => {
                            let failed = result.is_err();
                            if sender.send(result).await.is_err() || failed {
                                break;
                            }
                        }
                        Ok(_) => debug!("Discarding result of a superseded batch"),
                        Err(e) if e.is_cancelled() => {}
                        Err(e) => {
                            warn!("Pipeline task failed: {}", e);
                            sender.send(Err(TransformError::Unknown(e.to_string()))).await.ok();
                            break;
                        }
                    },
                    else => break,
                }
            }
            in_flight.abort_all();
        });
        FrameStream {
            receiver,
            driver,
            finished: false,
        }
    }

    pub fn dump(&self) -> String {
        let mut ret = String::from("(frames)\n");
        for stage in &self.stages {
            ret.push_str(&format!("| {}\n", stage.transformation.dump()));
        }
        ret.push_str(";\n");
        ret
    }
}

/**
 * Output of `Pipeline::process_stream`
 */
#[derive(Debug)]
pub struct FrameStream {
    receiver: mpsc::Receiver<Result<Vec<DataFrame>, TransformError>>,
    driver: JoinHandle<()>,
    finished: bool,
}

impl Stream for FrameStream {
    type Item = Result<Vec<DataFrame>, TransformError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(Err(e))) => {
                self.finished = true;
                self.driver.abort();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.driver.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::pipeline::{Field, TransformerDefinition, Value};

    fn frames() -> Vec<DataFrame> {
        vec![
            DataFrame::new(vec![
                Field::time("time", [1000, 250, 2000, 500]),
                Field::number("temperature", [12.12, 2.5, 14.44, 10.1]),
            ])
            .unwrap()
            .named("series1")
            .with_ref_id("A"),
            DataFrame::new(vec![
                Field::time("time", [500, 750, 1000, 3000]),
                Field::number("temperature", [11.11, 7.5, 13.13, 18.18]),
            ])
            .unwrap()
            .named("series3")
            .with_ref_id("B"),
        ]
    }

    #[test]
    fn test_disabled_entries_are_identity() {
        let ctx = BuildContext::default();
        let configs: Vec<TransformerConfig> = serde_json::from_value(json!([
            {"id": "joinByField", "disabled": true},
            {"id": "limit", "options": {"limitField": 1}, "disabled": true},
            {"id": "organize", "options": {"excludeByName": {"time": true}}, "disabled": true},
        ]))
        .unwrap();
        let pipeline = Pipeline::build(&configs, &ctx).unwrap();
        assert!(pipeline.stages.is_empty());
        assert_eq!(pipeline.apply(&frames()).unwrap(), frames());
    }

    #[test]
    fn test_fail_fast() {
        let ctx = BuildContext::default();
        let configs = vec![
            TransformerConfig::new("limit", json!({})),
            TransformerConfig::new("bogus", json!({})),
        ];
        assert_eq!(
            Pipeline::build(&configs, &ctx).unwrap_err(),
            TransformError::TransformerNotFound("bogus".to_string())
        );
        // A disabled unknown entry is never resolved
        let configs = vec![TransformerConfig::new("bogus", json!({})).disabled()];
        assert!(Pipeline::build(&configs, &ctx).is_ok());
    }

    #[test]
    fn test_join_end_to_end() {
        let ctx = BuildContext::default();
        let pipeline = Pipeline::parse(r#"[{"id": "joinByField", "options": {"byField": "time"}}]"#, &ctx).unwrap();
        let ret = pipeline.apply(&frames()).unwrap();
        assert_eq!(ret.len(), 1);
        let frame = &ret[0];
        let names: Vec<_> = frame.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["time", "series1", "series3"]);
        assert_eq!(json!(frame.fields()[0].values), json!([250, 500, 750, 1000, 2000, 3000]));
        assert_eq!(
            json!(frame.fields()[1].values),
            json!([2.5, 10.1, null, 12.12, 14.44, null])
        );
        assert_eq!(
            json!(frame.fields()[2].values),
            json!([null, 11.11, 7.5, 13.13, null, 18.18])
        );
    }

    #[test]
    fn test_stages_are_sequential() {
        let ctx = BuildContext::default();
        let configs = vec![
            TransformerConfig::new("joinByField", json!({})),
            TransformerConfig::new("sortBy", json!({"sort": [{"field": "time", "desc": true}]})),
            TransformerConfig::new("limit", json!({"limitField": 2})),
        ];
        let pipeline = Pipeline::build(&configs, &ctx).unwrap();
        let ret = pipeline.apply(&frames()).unwrap();
        assert_eq!(ret[0].len(), 2);
        assert_eq!(ret[0].fields()[0].values, vec![Value::from(3000), Value::from(2000)]);
        assert_eq!(pipeline.dump().lines().count(), 5);
    }

    #[derive(Debug)]
    struct Slow {
        delay: Duration,
        prepared: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Transformation for Slow {
        async fn prepare(&self) -> Result<(), TransformError> {
            tokio::time::sleep(self.delay).await;
            self.prepared.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn apply(&self, frames: &[DataFrame]) -> Result<Vec<DataFrame>, TransformError> {
            if frames.iter().any(|f| f.name.as_deref() == Some("poison")) {
                return Err(TransformError::Unknown("poisoned".to_string()));
            }
            Ok(frames.to_vec())
        }

        fn dump(&self) -> String {
            "slow".to_string()
        }
    }

    fn slow_pipeline(delay: Duration) -> (Arc<Pipeline>, Arc<AtomicUsize>) {
        let prepared = Arc::new(AtomicUsize::new(0));
        let counter = prepared.clone();
        let mut ctx = BuildContext::default();
        ctx.transformers
            .register(TransformerDefinition::with_builder(
                "slow",
                "Slow",
                "Waits before passing frames through",
                json!({}),
                move |_, _| {
                    Ok(Box::new(Slow {
                        delay,
                        prepared: counter.clone(),
                    }) as Box<dyn Transformation>)
                },
            ))
            .unwrap();
        let pipeline = Pipeline::build(&[TransformerConfig::new("slow", json!(null))], &ctx).unwrap();
        (Arc::new(pipeline), prepared)
    }

    fn batch(name: &str) -> Vec<DataFrame> {
        vec![DataFrame::new(vec![Field::number("v", [1.0])]).unwrap().named(name)]
    }

    #[tokio::test]
    async fn test_process() {
        let ctx = BuildContext::default();
        let pipeline = Pipeline::build(&[TransformerConfig::new("limit", json!({"limitField": 1}))], &ctx).unwrap();
        let ret = pipeline.process(&frames()).await.unwrap();
        assert!(ret.iter().all(|f| f.len() == 1));
    }

    #[tokio::test]
    async fn test_stream_latest_wins() {
        let (pipeline, _) = slow_pipeline(Duration::from_millis(50));
        let input = futures::stream::iter(vec![batch("first"), batch("second")]);
        let ret: Vec<_> = pipeline.process_stream(input).collect().await;
        assert_eq!(ret.len(), 1);
        assert_eq!(ret[0].as_ref().unwrap()[0].name.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_stream_keeps_order() {
        let (pipeline, _) = slow_pipeline(Duration::from_millis(1));
        let input = futures::stream::iter(vec![batch("a"), batch("b"), batch("c")])
            .then(|b| async move {
                tokio::time::sleep(Duration::from_millis(30)).await;
                b
            });
        let ret: Vec<_> = pipeline
            .process_stream(input)
            .map(|r| r.unwrap()[0].name.clone().unwrap())
            .collect()
            .await;
        assert_eq!(ret, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_stream_error_ends_stream() {
        let (pipeline, _) = slow_pipeline(Duration::from_millis(1));
        let input = futures::stream::iter(vec![batch("poison"), batch("ok")])
            .then(|b| async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                b
            });
        let ret: Vec<_> = pipeline.process_stream(input).collect().await;
        assert_eq!(ret.len(), 1);
        assert!(ret[0].is_err());
    }

    #[tokio::test]
    async fn test_drop_stops_work() {
        let (pipeline, prepared) = slow_pipeline(Duration::from_millis(100));
        let input = futures::stream::iter(vec![batch("a")]);
        let stream = pipeline.process_stream(input);
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(stream);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(prepared.load(Ordering::SeqCst), 0);
    }
}
