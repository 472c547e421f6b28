use std::sync::Arc;

use clap::Parser;
use futures::{stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info, instrument, warn};

use crate::{load_file, BuildContext, DataFrame, Logged, Pipeline, TransformError};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Frames file name or URL, a JSON array of frames
    #[arg(short, long, env = "FRAMES_FILE", required_unless_present = "stream")]
    pub frames: Option<String>,

    /// Transformation chain file name or URL, a JSON array of transformer configs
    #[arg(short, long, env = "TRANSFORMATIONS_FILE")]
    pub transformations: String,

    /// Write the result to this file instead of stdout
    #[arg(short, long, env = "OUTPUT_FILE")]
    pub output: Option<String>,

    /// Read newline-delimited frame batches from stdin, write one result line per batch
    #[arg(long, default_value_t = false, env = "STREAM_MODE")]
    pub stream: bool,

    /// Print the pipeline and exit
    #[arg(long, default_value_t = false)]
    pub dump: bool,
}

/**
 * Frames are either a JSON array of frames or a single frame object
 */
fn parse_frames(text: &str) -> Result<Vec<DataFrame>, TransformError> {
    let json: serde_json::Value = serde_json::from_str(text)?;
    Ok(match json {
        serde_json::Value::Array(_) => serde_json::from_value(json)?,
        _ => vec![serde_json::from_value(json)?],
    })
}

async fn write_output(output: &Option<String>, content: String) -> Result<(), TransformError> {
    match output {
        Some(path) => tokio::fs::write(path, content)
            .await
            .map_err(|e| TransformError::IoError(format!("{}: {}", path, e)))
            .log(),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

/**
 * Apply the pipeline to every line of `reader`, writing one JSON line per result.
 * Lines that are not valid frames are skipped.
 */
async fn run_stream<R, W>(pipeline: Arc<Pipeline>, reader: R, writer: &mut W) -> Result<usize, TransformError>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let batches = stream::unfold(reader.lines(), |mut lines| async move {
        match lines.next_line().await {
            Ok(Some(line)) => Some((line, lines)),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read input, stopping: {}", e);
                None
            }
        }
    })
    .filter_map(|line| async move {
        if line.trim().is_empty() {
            return None;
        }
        parse_frames(&line)
            .map_err(|e| warn!("Skipping invalid batch: {}", e))
            .ok()
    });

    let mut results = pipeline.process_stream(batches);
    let mut count = 0;
    while let Some(result) = results.next().await {
        let mut line = serde_json::to_string(&result?)?;
        line.push('\n');
        writer
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransformError::IoError(e.to_string()))?;
        count += 1;
    }
    writer
        .flush()
        .await
        .map_err(|e| TransformError::IoError(e.to_string()))?;
    Ok(count)
}

/**
 * Load the transformation chain, then transform a frames file or a stream of batches from stdin
 */
#[instrument(level = "debug")]
pub async fn run(args: Args) -> Result<(), TransformError> {
    let ctx = BuildContext::default();
    let pipeline = Pipeline::parse(&load_file(&args.transformations).await?, &ctx)?;
    info!("Pipeline loaded with {} stages", pipeline.stages.len());
    debug!("Pipeline:\n{}", pipeline.dump());

    if args.dump {
        return write_output(&args.output, pipeline.dump()).await;
    }

    if args.stream {
        let pipeline = Arc::new(pipeline);
        pipeline.prepare().await?;
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        let count = match &args.output {
            Some(path) => {
                let mut file = tokio::fs::File::create(path)
                    .await
                    .map_err(|e| TransformError::IoError(format!("{}: {}", path, e)))
                    .log()?;
                run_stream(pipeline, stdin, &mut file).await?
            }
            None => run_stream(pipeline, stdin, &mut tokio::io::stdout()).await?,
        };
        info!("Input stream ended, {} results written", count);
        return Ok(());
    }

    let path = args.frames.as_deref().ok_or_else(|| {
        TransformError::IoError("Frames file is required unless streaming".to_string())
    })?;
    let frames = parse_frames(&load_file(path).await?)?;
    let ret = pipeline.process(&frames).await?;
    info!("Transformed {} frames into {} frames", frames.len(), ret.len());
    write_output(&args.output, serde_json::to_string_pretty(&ret)?).await
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    const TRANSFORMATIONS: &str = r#"[
        {"id": "joinByField", "options": {}},
        {"id": "sortBy", "options": {"sort": [{"field": "time", "desc": true}]}},
        {"id": "limit", "options": {"limitField": 2}, "disabled": true}
    ]"#;

    fn frames_json() -> serde_json::Value {
        json!([
            {"name": "A", "fields": [
                {"name": "time", "type": "time", "values": [1000, 2000]},
                {"name": "value", "type": "number", "values": [1, 2]}
            ]},
            {"name": "B", "fields": [
                {"name": "time", "type": "time", "values": [2000, 3000]},
                {"name": "value", "type": "number", "values": [20, 30]}
            ]}
        ])
    }

    fn temp_path(name: &str) -> String {
        std::env::temp_dir()
            .join(format!("frame-transforms-runner-{}-{}", std::process::id(), name))
            .to_string_lossy()
            .to_string()
    }

    #[test]
    fn test_parse_frames() {
        assert_eq!(parse_frames(&frames_json().to_string()).unwrap().len(), 2);
        let single = parse_frames(&frames_json()[0].to_string()).unwrap();
        assert_eq!(single[0].name.as_deref(), Some("A"));
        assert!(matches!(
            parse_frames("[{\"fields\": 3}]"),
            Err(TransformError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_args() {
        let args = Args::try_parse_from(["frame-transforms", "-f", "in.json", "-t", "t.json"]).unwrap();
        assert_eq!(args.frames.as_deref(), Some("in.json"));
        assert!(!args.stream);
        let args = Args::try_parse_from(["frame-transforms", "-t", "t.json", "--stream"]).unwrap();
        assert!(args.stream);
        assert!(args.frames.is_none());
    }

    #[tokio::test]
    async fn test_run_files() {
        let (frames, transformations, output) = (
            temp_path("frames.json"),
            temp_path("transformations.json"),
            temp_path("output.json"),
        );
        tokio::fs::write(&frames, frames_json().to_string()).await.unwrap();
        tokio::fs::write(&transformations, TRANSFORMATIONS).await.unwrap();
        run(Args {
            frames: Some(frames.clone()),
            transformations: transformations.clone(),
            output: Some(output.clone()),
            stream: false,
            dump: false,
        })
        .await
        .unwrap();

        let ret: Vec<DataFrame> =
            serde_json::from_str(&tokio::fs::read_to_string(&output).await.unwrap()).unwrap();
        assert_eq!(ret.len(), 1);
        assert_eq!(json!(ret[0].fields()[0].values), json!([3000, 2000, 1000]));
        assert_eq!(json!(ret[0].fields()[1].values), json!([null, 2, 1]));
        assert_eq!(json!(ret[0].fields()[2].values), json!([30, 20, null]));

        for path in [frames, transformations, output] {
            tokio::fs::remove_file(path).await.ok();
        }
    }

    #[tokio::test]
    async fn test_run_missing_transformations() {
        let ret = run(Args {
            frames: Some("/nonexistent/frames.json".to_string()),
            transformations: "/nonexistent/transformations.json".to_string(),
            output: None,
            stream: false,
            dump: false,
        })
        .await;
        assert!(matches!(ret, Err(TransformError::IoError(_))));
    }

    #[tokio::test]
    async fn test_run_stream() {
        let pipeline = Arc::new(Pipeline::parse(TRANSFORMATIONS, &BuildContext::default()).unwrap());
        let input = format!("{}\n\nnot json\n", frames_json());
        let reader: &'static [u8] = Box::leak(input.into_bytes().into_boxed_slice());
        let mut output: Vec<u8> = vec![];
        let count = run_stream(pipeline, reader, &mut output).await.unwrap();
        assert_eq!(count, 1);
        let text = String::from_utf8(output).unwrap();
        let ret: Vec<DataFrame> = serde_json::from_str(text.trim()).unwrap();
        assert_eq!(ret[0].len(), 3);
    }
}
