use std::hint::black_box;
use std::io;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tileboard::logging::{LogEvent, LogSink};
use tileboard::tiles::{builtin_registry, default_layout};
use tileboard::{
    AnsiRenderer, Dashboard, DashboardRuntime, EngineConfig, Logger, LoggingResult, MemoryStore,
    RuntimeEvent, Size,
};

#[derive(Clone, Default)]
struct NullSink;

impl LogSink for NullSink {
    fn log(&self, _event: &LogEvent) -> LoggingResult<()> {
        Ok(())
    }
}

fn build_dashboard() -> Dashboard {
    let mut config = EngineConfig::default().with_logger(Logger::new(NullSink));
    config.metrics_interval = Duration::from_millis(0);
    config.enable_metrics();
    let registry = builtin_registry().expect("builtin registry");
    Dashboard::new(config, registry, default_layout(), MemoryStore::new())
}

fn full_render_pass(c: &mut Criterion) {
    let mut dashboard = build_dashboard();
    c.bench_function("full_render_pass", |b| {
        b.iter(|| black_box(dashboard.rerender()));
    });
}

fn paint_surface(c: &mut Criterion) {
    let dashboard = build_dashboard();
    let mut renderer = AnsiRenderer::with_default();
    c.bench_function("paint_surface", |b| {
        b.iter(|| {
            let mut sink = io::sink();
            renderer
                .render(&mut sink, black_box(dashboard.surface()), "", None)
                .expect("paint");
        });
    });
}

fn edit_session_script(c: &mut Criterion) {
    let key = |ch| RuntimeEvent::Key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
    let script = vec![
        RuntimeEvent::Resize(Size::new(120, 40)),
        key('e'),
        key('m'),
        RuntimeEvent::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
        key('d'),
        key('q'),
    ];
    c.bench_function("edit_session_script", |b| {
        b.iter(|| {
            let mut runtime = DashboardRuntime::new(build_dashboard(), AnsiRenderer::with_default());
            runtime
                .run_scripted(&mut io::sink(), black_box(script.clone()))
                .expect("scripted run");
        });
    });
}

criterion_group!(benches, full_render_pass, paint_surface, edit_session_script);
criterion_main!(benches);
