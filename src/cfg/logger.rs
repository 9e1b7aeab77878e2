// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fmt::Debug, path::Path};

use anyhow::{Context, Result};
use serde_json::json;
use tracing::{Event, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{self, FmtContext, FormatEvent, FormatFields, format::Writer, writer::BoxMakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
};

use crate::cfg::config::{GatewayConfig, LogFileConfig, Output, RotationFreq};

struct JsonFormatter {
    show_target: bool,
    show_module_path: bool,
    show_line: bool,
}

impl<S, N> FormatEvent<S, N> for JsonFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);

        let mut span_names = Vec::new();
        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                span_names.push(span.name().to_string());
            }
        }

        let entry = json!({
            "level": event.metadata().level().to_string(),
            "target": self.show_target.then(|| event.metadata().target().to_string()),
            "module_path": self.show_module_path.then(|| event.metadata().module_path().unwrap_or("").to_string()),
            "line": if self.show_line { event.metadata().line() } else { None },
            "spans": span_names,
            "fields": visitor.fields,
        });

        writeln!(writer, "{entry}")
    }
}

#[derive(Default)]
struct JsonVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
}

impl tracing::field::Visit for JsonVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn Debug) {
        self.fields
            .insert(field.name().to_string(), json!(format!("{value:?}")));
    }

    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields.insert(field.name().to_string(), json!(value));
    }
}

/// Installs the global `tracing` subscriber per `config.logging`. Returns the
/// `WorkerGuard` the caller must keep alive for the process lifetime (the
/// non-blocking writer flushes on drop).
pub fn init_logger(config: &GatewayConfig) -> Result<WorkerGuard> {
    let log = &config.logging;

    let (writer, guard) = make_writer(&log.output, log.file.as_ref())?;

    let env_filter = EnvFilter::try_new(&log.level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .context("failed to parse log level from config or env")?;

    if log.json {
        let json_layer = fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .event_format(JsonFormatter {
                show_target: log.is_show_target,
                show_module_path: log.is_show_module_path,
                show_line: log.is_show_line,
            });
        let subscriber = Registry::default().with(env_filter).with(json_layer);
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set global default subscriber")?;
    } else {
        let plain_layer = fmt::layer()
            .with_writer(writer)
            .with_target(log.is_show_target)
            .with_line_number(log.is_show_line);
        let subscriber = Registry::default().with(env_filter).with(plain_layer);
        tracing::subscriber::set_global_default(subscriber)
            .context("failed to set global default subscriber")?;
    }

    Ok(guard)
}

fn make_writer(
    output: &Output,
    file: Option<&LogFileConfig>,
) -> Result<(BoxMakeWriter, WorkerGuard)> {
    Ok(match output {
        Output::Stdout => {
            let (w, g) = tracing_appender::non_blocking(std::io::stdout());
            (BoxMakeWriter::new(w), g)
        },
        Output::Stderr => {
            let (w, g) = tracing_appender::non_blocking(std::io::stderr());
            (BoxMakeWriter::new(w), g)
        },
        Output::File => {
            let fcfg = file.context("logging.file is required when output = file")?;
            let path = Path::new(&fcfg.path);
            let dir = path.parent().unwrap_or_else(|| Path::new("."));

            let rotation = match fcfg.rotation_frequency.as_ref().unwrap_or(&RotationFreq::Never) {
                RotationFreq::Minutely => Rotation::MINUTELY,
                RotationFreq::Hourly => Rotation::HOURLY,
                RotationFreq::Daily => Rotation::DAILY,
                RotationFreq::Never => Rotation::NEVER,
            };

            let file_appender =
                RollingFileAppender::new(rotation, dir, path.file_name().unwrap_or_default());
            let (w, g) = tracing_appender::non_blocking(file_appender);
            (BoxMakeWriter::new(w), g)
        },
    })
}
