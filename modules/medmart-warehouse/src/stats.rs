/// Per-stage record accounting for one warehouse run. Every excluded row is
/// counted under a named bucket; nothing is dropped silently.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub records_in: u32,
    pub records_rejected: u32,
    pub duplicates_collapsed: u32,
    pub messages_curated: u32,
    pub valid_messages: u32,
    pub invalid_messages: u32,
    pub channels: u32,
    pub dates: u32,
    pub message_facts: u32,
    pub channel_lookup_misses: u32,
    pub date_lookup_misses: u32,
    pub detections_in: u32,
    pub detections_rejected: u32,
    pub detection_facts: u32,
    pub detections_unmatched: u32,
    pub checks_failed: u32,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Warehouse Run Complete ===")?;
        writeln!(f, "Raw records in:       {}", self.records_in)?;
        writeln!(f, "Rejected at ingest:   {}", self.records_rejected)?;
        writeln!(f, "Duplicates collapsed: {}", self.duplicates_collapsed)?;
        writeln!(f, "Messages curated:     {}", self.messages_curated)?;
        writeln!(f, "  valid:              {}", self.valid_messages)?;
        writeln!(f, "  invalid:            {}", self.invalid_messages)?;
        writeln!(f, "Channels:             {}", self.channels)?;
        writeln!(f, "Dates:                {}", self.dates)?;
        writeln!(f, "Message facts:        {}", self.message_facts)?;
        writeln!(f, "  channel misses:     {}", self.channel_lookup_misses)?;
        writeln!(f, "  date misses:        {}", self.date_lookup_misses)?;
        writeln!(f, "Detections in:        {}", self.detections_in)?;
        writeln!(f, "  rejected:           {}", self.detections_rejected)?;
        writeln!(f, "Detection facts:      {}", self.detection_facts)?;
        writeln!(f, "  unmatched:          {}", self.detections_unmatched)?;
        writeln!(f, "Checks failed:        {}", self.checks_failed)?;
        Ok(())
    }
}
