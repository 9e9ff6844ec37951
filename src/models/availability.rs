use std::collections::BTreeMap;

use chrono::NaiveTime;
use serde::Deserialize;

/// One open window within a day, expressed as local times of day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AvailabilityBlock {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// Per-weekday availability template, keyed 1=Monday .. 7=Sunday.
#[derive(Debug, Clone)]
pub struct WeeklyAvailability {
    blocks: BTreeMap<u32, Vec<AvailabilityBlock>>,
}

#[derive(Deserialize)]
struct BlockJson {
    start: String,
    end: String,
}

impl WeeklyAvailability {
    /// Parse a template from JSON shaped `{"1": [{"start": "08:00", "end": "20:00"}], ...}`.
    pub fn from_json(s: &str) -> anyhow::Result<Self> {
        let raw: BTreeMap<String, Vec<BlockJson>> = serde_json::from_str(s)?;

        let mut blocks = BTreeMap::new();
        for (day, entries) in raw {
            let weekday: u32 = day
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid weekday key: {day}"))?;
            if !(1..=7).contains(&weekday) {
                return Err(anyhow::anyhow!("weekday out of range: {weekday}"));
            }

            let mut parsed = Vec::with_capacity(entries.len());
            for entry in entries {
                let start = parse_time(&entry.start)?;
                let end = parse_time(&entry.end)?;
                if end <= start {
                    return Err(anyhow::anyhow!(
                        "block end must be after start: {}-{}",
                        entry.start,
                        entry.end
                    ));
                }
                parsed.push(AvailabilityBlock { start, end });
            }
            blocks.insert(weekday, parsed);
        }

        Ok(Self { blocks })
    }

    /// Default template: open 08:00-20:00 every day of the week.
    pub fn full_week() -> Self {
        let day_block = vec![AvailabilityBlock {
            start: NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            end: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        }];
        let blocks = (1..=7).map(|d| (d, day_block.clone())).collect();
        Self { blocks }
    }

    pub fn empty() -> Self {
        Self {
            blocks: BTreeMap::new(),
        }
    }

    /// Blocks for a weekday (1=Monday .. 7=Sunday); empty when unconfigured.
    pub fn blocks_for(&self, weekday: u32) -> &[AvailabilityBlock] {
        self.blocks.get(&weekday).map(Vec::as_slice).unwrap_or(&[])
    }
}

fn parse_time(s: &str) -> anyhow::Result<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|_| anyhow::anyhow!("invalid time format: {s}"))
}
