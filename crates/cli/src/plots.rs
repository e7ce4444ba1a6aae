//! Chart.js dashboard for a batch of runs
//!
//! The page is a single self-contained HTML file. Chart data is serialized with
//! `serde_json` and substituted into a static template, with time axes expressed as
//! minutes since each run's first autoscaler sample.

use analysis_lib::metrics::{ThroughputReconciler, ThroughputSource};
use analysis_lib::{AnalysisConfig, Phase, PhaseAction, RunTelemetry, Timeline};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// File name of the dashboard inside the output directory
pub const DASHBOARD_FILE: &str = "dashboard.html";

const DATA_PLACEHOLDER: &str = "__DASHBOARD_DATA__";

/// Label prefix shared by the runs that only differ in metrics scraping period
const SCRAPE_PERIOD_PREFIX: &str = "pcm-cpu-";

/// Runs charted side by side in the head-to-head panel
const HEAD_TO_HEAD: [&str; 2] = ["pcm-h", "pcm-ch"];

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Plot series of a single run
#[derive(Debug, Clone, Serialize)]
pub struct RunSeries {
    pub label: String,
    pub replicas: Vec<Point>,
    pub desired: Vec<Point>,
    pub cpu: Vec<Point>,
    pub rps: Vec<Point>,
    pub rps_source: Option<ThroughputSource>,
    /// High-load windows as `[start, end]` minutes
    pub high_phases: Vec<[f64; 2]>,
    /// Replica count against CPU utilization, one point per sample with both
    pub efficiency: Vec<Point>,
}

/// A panel restricted to a subset of runs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub title: String,
    pub labels: Vec<String>,
    /// Also chart CPU utilization next to replicas
    pub include_cpu: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardData {
    pub target_util: f64,
    pub runs: Vec<RunSeries>,
    pub comparisons: Vec<Comparison>,
}

impl DashboardData {
    pub fn build(runs: &[RunTelemetry], config: &AnalysisConfig) -> Self {
        let reconciler = ThroughputReconciler::new(&config.throughput_order);
        let runs: Vec<RunSeries> = runs
            .iter()
            .filter(|run| run.is_usable())
            .filter_map(|run| run_series(run, &reconciler))
            .collect();
        let labels: Vec<&str> = runs.iter().map(|run| run.label.as_str()).collect();

        Self {
            target_util: config.target_utilization_percent,
            comparisons: comparisons(&labels),
            runs,
        }
    }

    pub fn render(&self) -> Result<String> {
        let json = serde_json::to_string(self).context("Failed to serialize chart data")?;
        // Keep run labels from closing the script element
        let json = json.replace("</", "<\\/");
        Ok(TEMPLATE.replace(DATA_PLACEHOLDER, &json))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, self.render()?)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Comparison panels whose runs are all present
///
/// Scraping periods need at least two `pcm-cpu-*` runs; the head-to-head panel needs
/// both of its runs.
fn comparisons(labels: &[&str]) -> Vec<Comparison> {
    let mut panels = Vec::new();

    let scrape: Vec<String> = labels
        .iter()
        .filter(|label| label.starts_with(SCRAPE_PERIOD_PREFIX))
        .map(|label| label.to_string())
        .collect();
    if scrape.len() >= 2 {
        panels.push(Comparison {
            title: "PCM-CPU: Scraping Period Comparison".to_string(),
            labels: scrape,
            include_cpu: false,
        });
    }

    if HEAD_TO_HEAD.iter().all(|label| labels.contains(label)) {
        panels.push(Comparison {
            title: "PCM-H vs PCM-CH".to_string(),
            labels: HEAD_TO_HEAD.iter().map(|label| label.to_string()).collect(),
            include_cpu: true,
        });
    }

    panels
}

fn minutes_since(t0: DateTime<Utc>, t: DateTime<Utc>) -> f64 {
    (t - t0).num_milliseconds() as f64 / 60_000.0
}

fn run_series(run: &RunTelemetry, reconciler: &ThroughputReconciler) -> Option<RunSeries> {
    let timeline = Timeline::from_slice(&run.autoscaler);
    let t0 = timeline.first()?.timestamp;
    let at = |t: DateTime<Utc>| minutes_since(t0, t);

    let samples = timeline.samples();
    let replicas = samples
        .iter()
        .map(|s| Point {
            x: at(s.timestamp),
            y: s.current_replicas as f64,
        })
        .collect();
    let desired = samples
        .iter()
        .filter_map(|s| {
            s.desired_replicas.map(|d| Point {
                x: at(s.timestamp),
                y: d as f64,
            })
        })
        .collect();
    let cpu = timeline
        .utilization_points()
        .into_iter()
        .map(|(t, util)| Point { x: at(t), y: util })
        .collect();
    let efficiency = samples
        .iter()
        .filter_map(|s| {
            s.current_cpu_utilization_percent.map(|util| Point {
                x: s.current_replicas as f64,
                y: util,
            })
        })
        .collect();

    let (rps_source, rps) = match reconciler.select(run) {
        Some((source, points)) => (
            Some(source),
            points
                .into_iter()
                .map(|(t, v)| Point { x: at(t), y: v })
                .collect(),
        ),
        None => (None, Vec::new()),
    };

    Some(RunSeries {
        label: run.label.clone(),
        replicas,
        desired,
        cpu,
        rps,
        rps_source,
        high_phases: high_phase_windows(run, t0),
        efficiency,
    })
}

/// Pair each high-phase start with the first high-phase end after it
///
/// A start without a later end is dropped.
fn high_phase_windows(run: &RunTelemetry, t0: DateTime<Utc>) -> Vec<[f64; 2]> {
    let mut events: Vec<_> = run
        .phases
        .iter()
        .filter(|event| event.phase == Phase::High)
        .collect();
    events.sort_by_key(|event| event.timestamp);

    events
        .iter()
        .filter(|event| event.action == PhaseAction::Start)
        .filter_map(|start| {
            events
                .iter()
                .find(|end| end.action == PhaseAction::End && end.timestamp > start.timestamp)
                .map(|end| {
                    [
                        minutes_since(t0, start.timestamp),
                        minutes_since(t0, end.timestamp),
                    ]
                })
        })
        .collect()
}

const TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>HPA Experiment Analysis</title>
    <script src="https://cdnjs.cloudflare.com/ajax/libs/Chart.js/3.9.1/chart.min.js"></script>
    <style>
        body {
            font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
            margin: 20px;
            background: #2f3033;
        }
        .container { max-width: 1400px; margin: 0 auto; }
        h1 { color: white; text-align: center; margin-bottom: 10px; }
        .subtitle { color: rgba(255,255,255,0.85); text-align: center; margin-bottom: 30px; }
        .chart-container {
            background: white;
            padding: 25px;
            margin: 20px 0;
            border-radius: 12px;
            box-shadow: 0 8px 32px rgba(0,0,0,0.2);
        }
        .chart-container h2 {
            color: #333;
            margin-top: 0;
            border-bottom: 3px solid #232325;
            padding-bottom: 10px;
        }
        canvas { max-height: 400px; }
        .grid-2 { display: grid; grid-template-columns: 1fr 1fr; gap: 20px; }
        @media (max-width: 900px) { .grid-2 { grid-template-columns: 1fr; } }
    </style>
</head>
<body>
    <div class="container">
        <h1>HPA Experiment Analysis</h1>
        <p class="subtitle">Shaded bands mark high-load phases. Time is minutes since each run's first sample.</p>

        <div class="chart-container">
            <h2>Pod Replicas Over Time</h2>
            <canvas id="replicasChart"></canvas>
        </div>

        <div class="chart-container">
            <h2>CPU Utilization Over Time</h2>
            <canvas id="cpuChart"></canvas>
        </div>

        <div class="chart-container">
            <h2>HTTP Request Rate Over Time</h2>
            <canvas id="rpsChart"></canvas>
        </div>

        <div class="chart-container">
            <h2>Desired vs Current Replicas</h2>
            <div class="grid-2" id="desiredGrid"></div>
        </div>

        <div class="chart-container">
            <h2>Scaling Efficiency: CPU vs Replicas</h2>
            <canvas id="efficiencyChart"></canvas>
        </div>

        <div id="comparisons"></div>
    </div>

    <script>
        const data = __DASHBOARD_DATA__;
        const palette = ['#ff6384', '#36a2eb', '#4bc0c0', '#ff9f40', '#9966ff', '#ffcd56', '#c9cbcf', '#2e7d32'];
        const color = i => palette[i % palette.length];

        const phaseShading = {
            id: 'phaseShading',
            beforeDatasetsDraw(chart) {
                const { ctx, chartArea, scales } = chart;
                ctx.save();
                ctx.fillStyle = 'rgba(255, 99, 132, 0.08)';
                data.runs.forEach(run => run.high_phases.forEach(([start, end]) => {
                    const x0 = scales.x.getPixelForValue(start);
                    const x1 = scales.x.getPixelForValue(end);
                    ctx.fillRect(x0, chartArea.top, x1 - x0, chartArea.bottom - chartArea.top);
                }));
                ctx.restore();
            }
        };

        const timeOptions = yTitle => ({
            responsive: true,
            maintainAspectRatio: true,
            plugins: { legend: { display: true, position: 'top' } },
            scales: {
                x: { type: 'linear', title: { display: true, text: 'Time (minutes)' } },
                y: { beginAtZero: true, title: { display: true, text: yTitle } }
            }
        });

        const lineSet = (label, points, i, stepped) => ({
            label: label,
            data: points,
            borderColor: color(i),
            backgroundColor: color(i),
            borderWidth: 2,
            pointRadius: 0,
            stepped: stepped,
            fill: false
        });

        new Chart(document.getElementById('replicasChart'), {
            type: 'line',
            data: { datasets: data.runs.map((run, i) => lineSet(run.label, run.replicas, i, true)) },
            options: timeOptions('Replicas'),
            plugins: [phaseShading]
        });

        const cpuSets = data.runs.map((run, i) => lineSet(run.label, run.cpu, i, false));
        const cpuXs = data.runs.flatMap(run => run.cpu.map(p => p.x));
        if (cpuXs.length > 0) {
            cpuSets.push({
                label: 'Target (' + data.target_util + '%)',
                data: [
                    { x: Math.min(...cpuXs), y: data.target_util },
                    { x: Math.max(...cpuXs), y: data.target_util }
                ],
                borderColor: '#e53935',
                borderDash: [6, 4],
                borderWidth: 2,
                pointRadius: 0,
                fill: false
            });
        }
        new Chart(document.getElementById('cpuChart'), {
            type: 'line',
            data: { datasets: cpuSets },
            options: timeOptions('CPU utilization (%)'),
            plugins: [phaseShading]
        });

        new Chart(document.getElementById('rpsChart'), {
            type: 'line',
            data: {
                datasets: data.runs
                    .filter(run => run.rps.length > 0)
                    .map((run, i) => lineSet(run.label + ' (' + run.rps_source + ')', run.rps, i, false))
            },
            options: timeOptions('Requests per second'),
            plugins: [phaseShading]
        });

        const grid = document.getElementById('desiredGrid');
        data.runs.forEach(run => {
            const canvas = document.createElement('canvas');
            grid.appendChild(canvas);
            const options = timeOptions('Replicas');
            options.plugins.title = { display: true, text: run.label };
            new Chart(canvas, {
                type: 'line',
                data: {
                    datasets: [
                        lineSet('Current', run.replicas, 1, true),
                        Object.assign(lineSet('Desired', run.desired, 0, true), { borderDash: [4, 3] })
                    ]
                },
                options: options
            });
        });

        new Chart(document.getElementById('efficiencyChart'), {
            type: 'scatter',
            data: {
                datasets: data.runs.map((run, i) => ({
                    label: run.label,
                    data: run.efficiency,
                    backgroundColor: color(i),
                    pointRadius: 4
                }))
            },
            options: {
                responsive: true,
                maintainAspectRatio: true,
                scales: {
                    x: { type: 'linear', title: { display: true, text: 'Replicas' } },
                    y: { beginAtZero: true, title: { display: true, text: 'CPU utilization (%)' } }
                }
            }
        });

        const comparisons = document.getElementById('comparisons');
        data.comparisons.forEach(comparison => {
            const panel = document.createElement('div');
            panel.className = 'chart-container';
            const heading = document.createElement('h2');
            heading.textContent = comparison.title;
            panel.appendChild(heading);
            const grid = document.createElement('div');
            grid.className = comparison.include_cpu ? 'grid-2' : '';
            panel.appendChild(grid);
            comparisons.appendChild(panel);

            const members = data.runs.filter(run => comparison.labels.includes(run.label));
            const addChart = (field, yTitle) => {
                const canvas = document.createElement('canvas');
                grid.appendChild(canvas);
                new Chart(canvas, {
                    type: 'line',
                    data: { datasets: members.map((run, i) => lineSet(run.label, run[field], i, field === 'replicas')) },
                    options: timeOptions(yTitle)
                });
            };
            if (comparison.include_cpu) {
                addChart('cpu', 'CPU utilization (%)');
            }
            addChart('replicas', 'Replicas');
        });
    </script>
</body>
</html>
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_lib::{PhaseEvent, RatePoint, Sample};
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn sample(secs: i64, replicas: u32, util: Option<f64>) -> Sample {
        Sample {
            timestamp: at(secs),
            current_replicas: replicas,
            desired_replicas: Some(replicas + 1),
            current_cpu_utilization_percent: util,
            http_requests_per_second: None,
        }
    }

    fn phase(secs: i64, phase: Phase, action: PhaseAction) -> PhaseEvent {
        PhaseEvent {
            timestamp: at(secs),
            phase,
            action,
        }
    }

    fn run() -> RunTelemetry {
        let mut run = RunTelemetry::new("pcm-cpu-60s");
        run.autoscaler = vec![
            sample(60, 2, Some(80.0)),
            sample(0, 1, None),
            sample(120, 2, Some(55.0)),
        ];
        run.phases = vec![
            phase(30, Phase::High, PhaseAction::Start),
            phase(90, Phase::High, PhaseAction::End),
            phase(150, Phase::High, PhaseAction::Start),
        ];
        run.dedicated_rate = vec![
            RatePoint {
                timestamp: at(60),
                value: Some(10.0),
            },
            RatePoint {
                timestamp: at(120),
                value: Some(20.0),
            },
        ];
        run
    }

    #[test]
    fn test_series_use_minutes_since_first_sample() {
        let data = DashboardData::build(&[run()], &AnalysisConfig::default());
        let series = &data.runs[0];

        let xs: Vec<f64> = series.replicas.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);
        assert_eq!(series.cpu, vec![Point { x: 1.0, y: 80.0 }, Point { x: 2.0, y: 55.0 }]);
        assert_eq!(series.desired[0], Point { x: 0.0, y: 2.0 });
        assert_eq!(series.efficiency.len(), 2);
    }

    #[test]
    fn test_rate_series_follows_selected_source() {
        let data = DashboardData::build(&[run()], &AnalysisConfig::default());
        let series = &data.runs[0];

        assert_eq!(series.rps_source, Some(ThroughputSource::DedicatedRate));
        assert_eq!(series.rps, vec![Point { x: 1.0, y: 10.0 }, Point { x: 2.0, y: 20.0 }]);
    }

    #[test]
    fn test_unterminated_high_phase_is_dropped() {
        let data = DashboardData::build(&[run()], &AnalysisConfig::default());
        assert_eq!(data.runs[0].high_phases, vec![[0.5, 1.5]]);
    }

    #[test]
    fn test_unusable_runs_are_skipped() {
        let data = DashboardData::build(&[RunTelemetry::new("empty")], &AnalysisConfig::default());
        assert!(data.runs.is_empty());
    }

    #[test]
    fn test_comparison_panels_need_their_runs() {
        assert!(comparisons(&["pcm-cpu-60s", "pcm-h"]).is_empty());

        let panels = comparisons(&["pcm-ch", "pcm-cpu-15s", "pcm-cpu-60s", "pcm-h"]);
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].labels, vec!["pcm-cpu-15s", "pcm-cpu-60s"]);
        assert!(!panels[0].include_cpu);
        assert_eq!(panels[1].labels, vec!["pcm-h", "pcm-ch"]);
        assert!(panels[1].include_cpu);
    }

    #[test]
    fn test_comparisons_skip_unusable_runs() {
        let mut scrape_15 = run();
        scrape_15.label = "pcm-cpu-15s".to_string();
        let data = DashboardData::build(
            &[run(), scrape_15, RunTelemetry::new("pcm-cpu-30s")],
            &AnalysisConfig::default(),
        );
        assert_eq!(data.comparisons.len(), 1);
        assert_eq!(data.comparisons[0].labels, vec!["pcm-cpu-60s", "pcm-cpu-15s"]);
    }

    #[test]
    fn test_render_embeds_escaped_data() {
        let mut run = run();
        run.label = "</script>".to_string();
        let html = DashboardData::build(&[run], &AnalysisConfig::default())
            .render()
            .unwrap();

        assert!(!html.contains(DATA_PLACEHOLDER));
        assert!(html.contains("\"target_util\":60.0"));
        assert!(html.contains("<\\/script>"));
        assert_eq!(html.matches("</script>").count(), 2);
    }
}
