use crate::{
    domain::ProjectId,
    ticker::{
        format::{abbr, to_index_series},
        ProjectTickerDatum,
    },
};

struct SeedRow {
    id: &'static str,
    name: &'static str,
    profit: f64,
    margin: f64,
    time_saved_hrs: f64,
    prs: i64,
    app_events: i64,
    raw_index: [f64; 30],
}

const SEED: [SeedRow; 5] = [
    SeedRow {
        id: "1",
        name: "E-Commerce Platform",
        profit: 12_300.0,
        margin: 0.31,
        time_saved_hrs: 14.0,
        prs: 8,
        app_events: 127,
        raw_index: [
            100.0, 102.0, 98.0, 103.0, 105.0, 107.0, 104.0, 108.0, 112.0, 110.0, 115.0, 118.0,
            116.0, 120.0, 122.0, 119.0, 125.0, 128.0, 126.0, 130.0, 133.0, 131.0, 135.0, 138.0,
            136.0, 140.0, 143.0, 141.0, 145.0, 148.0,
        ],
    },
    SeedRow {
        id: "2",
        name: "Mobile App Redesign",
        profit: -2_100.0,
        margin: 0.18,
        time_saved_hrs: -3.0,
        prs: 12,
        app_events: 89,
        raw_index: [
            100.0, 99.0, 97.0, 95.0, 98.0, 96.0, 94.0, 97.0, 95.0, 93.0, 96.0, 94.0, 92.0, 95.0,
            93.0, 91.0, 94.0, 92.0, 90.0, 93.0, 91.0, 89.0, 92.0, 90.0, 88.0, 91.0, 89.0, 87.0,
            90.0, 88.0,
        ],
    },
    SeedRow {
        id: "3",
        name: "API Documentation Portal",
        profit: 8_700.0,
        margin: 0.42,
        time_saved_hrs: 22.0,
        prs: 5,
        app_events: 203,
        raw_index: [
            100.0, 101.0, 103.0, 102.0, 104.0, 106.0, 105.0, 107.0, 109.0, 108.0, 110.0, 112.0,
            111.0, 113.0, 115.0, 114.0, 116.0, 118.0, 117.0, 119.0, 121.0, 120.0, 122.0, 124.0,
            123.0, 125.0, 127.0, 126.0, 128.0, 130.0,
        ],
    },
    SeedRow {
        id: "4",
        name: "Internal Analytics Dashboard",
        profit: 15_600.0,
        margin: 0.55,
        time_saved_hrs: 31.0,
        prs: 3,
        app_events: 412,
        raw_index: [
            100.0, 103.0, 106.0, 104.0, 107.0, 110.0, 108.0, 111.0, 114.0, 112.0, 115.0, 118.0,
            116.0, 119.0, 122.0, 120.0, 123.0, 126.0, 124.0, 127.0, 130.0, 128.0, 131.0, 134.0,
            132.0, 135.0, 138.0, 136.0, 139.0, 142.0,
        ],
    },
    SeedRow {
        id: "5",
        name: "Customer Portal Migration",
        profit: 4_200.0,
        margin: 0.24,
        time_saved_hrs: 8.0,
        prs: 15,
        app_events: 156,
        raw_index: [
            100.0, 98.0, 101.0, 99.0, 102.0, 100.0, 103.0, 101.0, 104.0, 102.0, 105.0, 103.0,
            106.0, 104.0, 107.0, 105.0, 108.0, 106.0, 109.0, 107.0, 110.0, 108.0, 111.0, 109.0,
            112.0, 110.0, 113.0, 111.0, 114.0, 112.0,
        ],
    },
];

/// Deterministic sample data for five projects with 30 index points each
pub fn generate_seed() -> Vec<ProjectTickerDatum> {
    SEED.iter()
        .map(|row| ProjectTickerDatum {
            project_id: ProjectId::from(row.id),
            symbol: abbr(row.name),
            name: row.name.to_string(),
            profit: row.profit,
            margin: row.margin,
            time_saved_hrs: row.time_saved_hrs,
            prs: Some(row.prs),
            app_events: Some(row.app_events),
            index_series: to_index_series(&row.raw_index),
        })
        .collect()
}
