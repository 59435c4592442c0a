//! Flattened numeric table form: the text token sequence as `f64` values,
//! as embedded in firmware headers and detector bundles.
use super::error::CascadeError;
use super::model::Cascade;
use super::parse::{read_cascade, TableValues};
use super::text::link_value;

impl Cascade {
    /// Load from a flattened table. Values past the last stage are ignored.
    pub fn from_table(values: &[f64]) -> Result<Cascade, CascadeError> {
        read_cascade(&mut TableValues::new(values))
    }

    /// Parse a JSON array of numbers and load it as a table.
    pub fn from_table_json(json: &str) -> Result<Cascade, CascadeError> {
        let values: Vec<f64> = serde_json::from_str(json)?;
        Self::from_table(&values)
    }

    pub fn to_table(&self) -> Vec<f64> {
        let window = self.orig_window_size();
        let mut out = vec![
            window.width as f64,
            window.height as f64,
            self.stage_count() as f64,
        ];
        for stage in self.stages() {
            out.push(stage.classifiers.len() as f64);
            for c in &stage.classifiers {
                let rects = c.feature.rects();
                out.push(1.0);
                out.push(rects.len() as f64);
                for r in rects {
                    out.extend_from_slice(&[
                        r.rect.x as f64,
                        r.rect.y as f64,
                        r.rect.width as f64,
                        r.rect.height as f64,
                        f64::from(r.weight),
                    ]);
                }
                out.extend_from_slice(&[
                    if c.feature.tilted { 1.0 } else { 0.0 },
                    f64::from(c.threshold),
                    f64::from(c.left),
                    f64::from(c.right),
                ]);
            }
            out.push(f64::from(stage.threshold));
            out.push(link_value(stage.parent) as f64);
            out.push(link_value(stage.next) as f64);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARK_40X25: [f64; 64] = [
        40.0, 25.0, 2.0, 1.0, 1.0, 3.0, 9.0, 3.0, 6.0, 16.0, -1.0, 9.0, 3.0, 3.0, 8.0, 2.0, 12.0,
        11.0, 3.0, 8.0, 2.0, 0.0, 0.047854, -1.0, 0.994061, 0.994061, -1.0, -1.0, 2.0, 1.0, 2.0,
        4.0, 0.0, 28.0, 20.0, -1.0, 4.0, 5.0, 28.0, 10.0, 2.0, 0.0, 0.252720, -1.0, 0.996030, 1.0,
        2.0, 16.0, 10.0, 8.0, 8.0, -1.0, 16.0, 14.0, 8.0, 4.0, 2.0, 0.0, -0.042733, 0.992085,
        -0.999971, 1.988115, 0.0, -1.0,
    ];

    #[test]
    fn loads_embedded_mark_table() {
        let cascade = Cascade::from_table(&MARK_40X25).expect("load");
        assert_eq!(cascade.orig_window_size().width, 40);
        assert_eq!(cascade.orig_window_size().height, 25);
        assert_eq!(cascade.stage_count(), 2);
        assert_eq!(cascade.classifier_count(), 3);
        assert!(!cascade.stages()[0].two_rects);
        assert!(cascade.stages()[1].two_rects);
        assert_eq!(cascade.stages()[1].parent, Some(0));
        assert!(!cascade.is_tree());
        assert!(!cascade.has_tilted_features());
        let c = &cascade.stages()[1].classifiers[1];
        assert_eq!(c.threshold, -0.042733f32);
        assert_eq!((c.left, c.right), (0.992085f32, -0.999971f32));
    }

    #[test]
    fn padded_table_loads_but_truncated_table_fails() {
        let mut padded = MARK_40X25.to_vec();
        padded.extend_from_slice(&[0.0; 5]);
        assert_eq!(
            Cascade::from_table(&padded).expect("padded"),
            Cascade::from_table(&MARK_40X25).expect("plain")
        );
        assert!(matches!(
            Cascade::from_table(&MARK_40X25[..60]),
            Err(CascadeError::UnexpectedEnd { .. })
        ));
        assert!(matches!(
            Cascade::from_table(&[24.0, 24.5, 0.0]),
            Err(CascadeError::InvalidValue { field: "window height", .. })
        ));
    }

    #[test]
    fn table_and_text_round_trip() {
        let cascade = Cascade::from_table(&MARK_40X25).expect("load");
        assert_eq!(Cascade::from_table(&cascade.to_table()).expect("table"), cascade);
        assert_eq!(Cascade::from_text(&cascade.to_text()).expect("text"), cascade);
    }

    #[test]
    fn table_json_matches_slice() {
        let json = serde_json::to_string(&MARK_40X25.to_vec()).unwrap();
        assert_eq!(
            Cascade::from_table_json(&json).unwrap(),
            Cascade::from_table(&MARK_40X25).unwrap()
        );
        assert!(matches!(
            Cascade::from_table_json("{\"not\": \"a table\"}"),
            Err(CascadeError::Json(_))
        ));
    }
}
