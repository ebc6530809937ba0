use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sluice::{
    AsyncSlots, ChunkedHttp, CompiledSequence, Node, PlainTransport, RenderContext, Renderable,
    ResponseHead, Segment, SluiceError, StaticCache, StreamOpts, StreamWriter, Transport, class,
    component, doctype, el, fragment, stream_page, text,
};

#[derive(Parser, Debug)]
#[command(name = "sluice", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stream the demo page to stdout.
    Render(RenderArgs),
    /// Print the compiled segment layout of the demo page.
    Compile(CompileArgs),
    /// Serve the demo page over HTTP/1.1 with chunked encoding.
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
struct PageArgs {
    /// Streaming options JSON.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Delay of the slowest async slot, in milliseconds.
    #[arg(long, default_value_t = 200)]
    slow_ms: u64,

    /// Visitor name shown in the greeting.
    #[arg(long, default_value = "guest")]
    visitor: String,

    /// Replay a compiled sequence instead of walking the tree.
    #[arg(long, default_value_t = false)]
    compiled: bool,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Cancel the request before streaming; async slots deliver nothing.
    #[arg(long, default_value_t = false)]
    cancel: bool,

    /// Write an HTML comment after every flush.
    #[arg(long, default_value_t = false)]
    mark_flushes: bool,
}

#[derive(Parser, Debug)]
struct CompileArgs {
    /// Print the layout as JSON.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct ServeArgs {
    #[command(flatten)]
    page: PageArgs,

    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    addr: String,
}

/// Visitor name carried in the render context.
struct Visitor(String);

/// Delay applied by the demo slot producers.
#[derive(Clone, Copy)]
struct SlowBy(Duration);

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Compile(args) => cmd_compile(args),
        Command::Serve(args) => cmd_serve(args),
    }
}

fn load_opts(path: Option<&PathBuf>) -> anyhow::Result<StreamOpts> {
    match path {
        Some(p) => StreamOpts::from_path(p).with_context(|| format!("load config '{}'", p.display())),
        None => Ok(StreamOpts::default()),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("start tokio runtime")
}

/// Request-independent demo page. Per-request data and async slots come from the context.
fn demo_page() -> Node {
    let head = el("head")
        .child(el("meta").attr("charset", "utf-8"))
        .child(el("title").child("sluice demo"));

    let greeting = component(|ctx| {
        let name = ctx.get::<Visitor>().map_or("stranger", |v| v.0.as_str());
        Ok(el("p").class("greeting").child(format!("Hello, {name}!")).into())
    });

    let body = el("body")
        .class("page")
        .deferred(|ctx| {
            Ok(class(if ctx.get::<Visitor>().is_some() {
                "signed-in"
            } else {
                "anonymous"
            }))
        })
        .child(el("header").child(el("h1").child("Streaming demo")))
        .child(greeting)
        .child(
            el("main")
                .child(el("h2").child("Recommended"))
                .child(slot_section("recs", "Recommendations", 1))
                .child(el("h2").child("Latest"))
                .child(slot_section("news", "News", 4)),
        )
        .child(el("footer").child(text("rendered by sluice")));

    fragment([doctype(), el("html").attr("lang", "en").child(head).child(body).into()])
}

fn slot_section(id: &'static str, title: &'static str, divisor: u32) -> Node {
    component(move |ctx| {
        let Some(slots) = ctx.get::<AsyncSlots>() else {
            return Ok(el("p").class("unavailable").child("unavailable").into());
        };
        let delay = ctx.get::<SlowBy>().map_or(Duration::ZERO, |s| s.0 / divisor);
        let slot = slots.register(el("p").class("loading").child("loading…"), move |ctx| async move {
            tokio::select! {
                _ = ctx.canceled() => return Err(SluiceError::Canceled),
                _ = tokio::time::sleep(delay) => {}
            }
            Ok(el("section")
                .attr("id", id)
                .child(el("h3").child(title))
                .child(el("p").child(format!("ready after {} ms", delay.as_millis()))))
        });
        Ok(slot.into())
    })
}

fn request_context(page: &PageArgs, opts: &StreamOpts) -> anyhow::Result<RenderContext> {
    let ctx = RenderContext::new()
        .with_value(Visitor(page.visitor.clone()))
        .with_value(SlowBy(Duration::from_millis(page.slow_ms)));
    let slots = AsyncSlots::new(&ctx, opts)?;
    Ok(ctx.with_value(slots))
}

fn compiled_page(cache: &StaticCache<&'static str>) -> anyhow::Result<Arc<CompiledSequence>> {
    Ok(cache.get_or_build("demo", || Ok(demo_page()))?)
}

async fn serve_page<T: Transport>(
    page: &PageArgs,
    opts: &StreamOpts,
    cache: &StaticCache<&'static str>,
    tree: &Node,
    writer: &mut StreamWriter<T>,
    cancel: bool,
) -> anyhow::Result<()> {
    let ctx = request_context(page, opts)?;
    if cancel {
        ctx.cancel();
    }
    let slots = ctx
        .get::<AsyncSlots>()
        .cloned()
        .context("request context without async slots")?;

    let compiled;
    let renderable: &dyn Renderable = if page.compiled {
        compiled = compiled_page(cache)?;
        &*compiled
    } else {
        tree
    };

    let report = stream_page(&ctx, renderable, &slots, writer).await?;
    info!(
        bytes = report.bytes_sent,
        flushes = report.flushes,
        delivered = report.drain.delivered,
        aborted = report.drain.aborted,
        failed = report.drain.failed,
        "page streamed"
    );
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let opts = load_opts(args.page.config.as_ref())?;
    let rt = runtime()?;
    let cache = StaticCache::new();
    let tree = demo_page();

    let stdout = io::stdout().lock();
    let transport = FlushMarks {
        inner: PlainTransport::new(stdout),
        enabled: args.mark_flushes,
    };
    let mut writer = StreamWriter::new(transport, &opts);
    rt.block_on(serve_page(
        &args.page,
        &opts,
        &cache,
        &tree,
        &mut writer,
        args.cancel,
    ))
}

#[derive(serde::Serialize)]
struct Layout {
    fingerprint: String,
    static_bytes: usize,
    dynamic: usize,
    segments: Vec<SegmentInfo>,
}

#[derive(serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum SegmentInfo {
    Static { bytes: usize },
    Dynamic { label: &'static str },
}

fn cmd_compile(args: CompileArgs) -> anyhow::Result<()> {
    let compiled = CompiledSequence::build(&demo_page()).context("compile demo page")?;
    let layout = Layout {
        fingerprint: compiled.fingerprint().to_string(),
        static_bytes: compiled.static_len(),
        dynamic: compiled.dynamic_count(),
        segments: compiled
            .segments()
            .iter()
            .map(|s| match s {
                Segment::Static(bytes) => SegmentInfo::Static { bytes: bytes.len() },
                Segment::Dynamic(chunk) => SegmentInfo::Dynamic {
                    label: chunk.label(),
                },
            })
            .collect(),
    };

    let mut out = io::stdout().lock();
    if args.json {
        serde_json::to_writer_pretty(&mut out, &layout).context("write layout json")?;
        writeln!(out)?;
        return Ok(());
    }
    for (i, seg) in layout.segments.iter().enumerate() {
        match seg {
            SegmentInfo::Static { bytes } => writeln!(out, "{i:>3}  static   {bytes} bytes")?,
            SegmentInfo::Dynamic { label } => writeln!(out, "{i:>3}  dynamic  {label}")?,
        }
    }
    writeln!(
        out,
        "static bytes: {}, dynamic segments: {}",
        layout.static_bytes, layout.dynamic
    )?;
    writeln!(out, "fingerprint: {}", layout.fingerprint)?;
    Ok(())
}

fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let opts = Arc::new(load_opts(args.page.config.as_ref())?);
    let rt = runtime()?;
    let cache = Arc::new(StaticCache::new());
    let tree = Arc::new(demo_page());
    let page = Arc::new(args.page);

    if page.compiled {
        compiled_page(&cache)?;
    }

    let listener =
        TcpListener::bind(&args.addr).with_context(|| format!("bind '{}'", args.addr))?;
    info!(addr = %args.addr, "listening");

    for conn in listener.incoming() {
        let stream = match conn {
            Ok(s) => s,
            Err(err) => {
                warn!(error = %err, "accept failed");
                continue;
            }
        };
        let handle = rt.handle().clone();
        let (opts, cache, tree, page) = (
            Arc::clone(&opts),
            Arc::clone(&cache),
            Arc::clone(&tree),
            Arc::clone(&page),
        );
        std::thread::spawn(move || {
            let peer = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
            let result = handle_connection(stream, &opts, |writer| {
                handle.block_on(serve_page(&page, &opts, &cache, &tree, writer, false))
            });
            if let Err(err) = result {
                warn!(peer = %peer, error = %err, "request failed");
            }
        });
    }
    Ok(())
}

fn handle_connection<F>(stream: TcpStream, opts: &StreamOpts, serve: F) -> anyhow::Result<()>
where
    F: FnOnce(&mut StreamWriter<ChunkedHttp<TcpStream>>) -> anyhow::Result<()>,
{
    let mut reader = BufReader::new(stream.try_clone().context("clone connection")?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).context("read request line")?;
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line)? == 0 || line == "\r\n" || line == "\n" {
            break;
        }
    }
    info!(request = request_line.trim_end(), "request");

    let mut writer = StreamWriter::new(ChunkedHttp::new(stream), opts);
    writer.set_head(ResponseHead::html())?;
    serve(&mut writer)?;
    writer.flush()?;
    writer.into_inner().finish()?;
    Ok(())
}

/// Stdout transport that can mark flush boundaries with an HTML comment.
struct FlushMarks<W: Write> {
    inner: PlainTransport<W>,
    enabled: bool,
}

impl<W: Write> Write for FlushMarks<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.enabled {
            self.inner.write_all(b"\n<!-- flush -->\n")?;
        }
        self.inner.flush()
    }
}

impl<W: Write> Transport for FlushMarks<W> {
    fn send_head(&mut self, head: &ResponseHead) -> io::Result<()> {
        self.inner.send_head(head)
    }
}
