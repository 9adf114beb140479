//! Object gain calculation
//!
//! One call per metadata block:
//! decode position → screen scale → screen edge lock → channel lock →
//! divergence → extent panning per virtual source → power sum →
//! zone exclusion → gain → direct/diffuse split.

use nalgebra::Vector3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::PannerOptions;
use crate::conversion::{extent_cart_to_polar, point_cart_to_polar, point_polar_to_cart};
use crate::error::AdmResult;
use crate::extent::PolarExtentHandler;
use crate::geom::cart;
use crate::layout::Layout;
use crate::metadata::{ObjectBlock, ObjectPosition, ObjectTypeMetadata};
use crate::point_source::configure;
use crate::screen::Screen;
use crate::transform::{diverge, ChannelLockHandler, ScreenEdgeLockHandler, ScreenScaleHandler};
use crate::zone::ZoneExclusionHandler;

/// Direct and diffuse gains, one per layout channel (LFE included, always 0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectDiffuseGains {
    pub direct: Vec<f64>,
    pub diffuse: Vec<f64>,
}

impl DirectDiffuseGains {
    fn zeros(n: usize) -> Self {
        Self {
            direct: vec![0.0; n],
            diffuse: vec![0.0; n],
        }
    }
}

/// Gains for one block, with its timing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockGains {
    /// Block start time (seconds)
    pub rtime: Option<f64>,
    /// Block duration (seconds)
    pub duration: Option<f64>,
    pub gains: DirectDiffuseGains,
}

/// Gain calculator for objects on one loudspeaker layout
///
/// Immutable after construction; `render` can be called from any number of
/// threads at once.
pub struct GainCalc {
    layout: Layout,
    /// Indices of the non-LFE channels in `layout`
    panned_channels: Vec<usize>,
    extent: PolarExtentHandler,
    screen_scale: ScreenScaleHandler,
    screen_edge_lock: ScreenEdgeLockHandler,
    channel_lock: ChannelLockHandler,
    zone_exclusion: ZoneExclusionHandler,
}

impl GainCalc {
    /// Build all panners for `layout`.
    ///
    /// `reproduction_screen` of None disables screen scaling and screen edge lock.
    pub fn new(
        layout: &Layout,
        reproduction_screen: Option<Screen>,
        options: &PannerOptions,
    ) -> AdmResult<Self> {
        let _span = tracing::debug_span!("gain_calc", layout = %layout.name).entered();
        options.validate()?;

        let panning_layout = layout.without_lfe();
        let panned_channels = layout
            .channels
            .iter()
            .enumerate()
            .filter(|(_, c)| !c.is_lfe)
            .map(|(i, _)| i)
            .collect();

        let point_source = configure(&panning_layout)?;
        let extent = PolarExtentHandler::new(Box::new(point_source), options);

        let gain_calc = Self {
            layout: layout.clone(),
            panned_channels,
            extent,
            screen_scale: ScreenScaleHandler::new(reproduction_screen.as_ref()),
            screen_edge_lock: ScreenEdgeLockHandler::new(
                reproduction_screen.as_ref(),
                options.screen_edge_lock_compensation,
            ),
            channel_lock: ChannelLockHandler::new(&panning_layout, options.channel_lock_tolerance),
            zone_exclusion: ZoneExclusionHandler::new(&panning_layout)?,
        };

        log::debug!(
            "gain calculator ready for {} ({} channels, {} panned)",
            layout.name,
            layout.num_channels(),
            gain_calc.panned_channels.len()
        );
        Ok(gain_calc)
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Position vector in the coordinate system the block is rendered in
    fn decode_position(block: &ObjectBlock) -> Vector3<f64> {
        match (block.position, block.cartesian) {
            (ObjectPosition::Polar(p), false) => p.as_cartesian_array(),
            (ObjectPosition::Polar(p), true) => point_polar_to_cart(p.azimuth, p.elevation, p.distance),
            (ObjectPosition::Cartesian(p), true) => p.as_array(),
            (ObjectPosition::Cartesian(p), false) => {
                let (az, el, distance) = point_cart_to_polar(p.x, p.y, p.z);
                cart(az, el, distance)
            }
        }
    }

    /// Panning gains for the non-LFE channels, before zone exclusion and gain
    fn panning_gains(&self, block: &ObjectBlock, position: &Vector3<f64>) -> Vec<f64> {
        let (weights, positions) =
            diverge(position, block.object_divergence.as_ref(), block.cartesian);

        let mut power = vec![0.0; self.extent.num_channels()];
        for (weight, position) in weights.iter().zip(positions.iter()) {
            let pv = if block.cartesian {
                let (az, el, distance, width, height, depth) = extent_cart_to_polar(
                    position.x,
                    position.y,
                    position.z,
                    block.width,
                    block.height,
                    block.depth,
                );
                self.extent.handle(&cart(az, el, distance), width, height, depth)
            } else {
                self.extent.handle(position, block.width, block.height, block.depth)
            };

            for (acc, g) in power.iter_mut().zip(pv) {
                *acc += weight * g * g;
            }
        }

        power.into_iter().map(f64::sqrt).collect()
    }

    /// Gains for one metadata block
    pub fn render(&self, metadata: &ObjectTypeMetadata) -> DirectDiffuseGains {
        let block = &metadata.block_format;

        let position = Self::decode_position(block);
        let position = self.screen_scale.handle(
            &position,
            block.screen_ref,
            &metadata.reference_screen,
            block.cartesian,
        );
        let position =
            self.screen_edge_lock
                .handle(&position, &block.screen_edge_lock, block.cartesian);

        let excluded = self.zone_exclusion.excluded(&block.zone_exclusion);
        let position = self.channel_lock.handle(
            &position,
            block.channel_lock.as_ref(),
            &excluded,
            block.cartesian,
        );

        let gains = self.panning_gains(block, &position);
        let gains = self.zone_exclusion.handle(&gains, &excluded);

        let diffuse = block.diffuse.clamp(0.0, 1.0);
        let direct_scale = (1.0 - diffuse).sqrt();
        let diffuse_scale = diffuse.sqrt();

        let mut result = DirectDiffuseGains::zeros(self.layout.num_channels());
        for (&channel, g) in self.panned_channels.iter().zip(gains) {
            let g = if g.is_nan() { 0.0 } else { g } * block.gain;
            result.direct[channel] = g * direct_scale;
            result.diffuse[channel] = g * diffuse_scale;
        }
        result
    }

    /// Render independent blocks in parallel; output order matches input
    pub fn render_blocks(&self, blocks: &[ObjectTypeMetadata]) -> Vec<BlockGains> {
        blocks
            .par_iter()
            .map(|metadata| BlockGains {
                rtime: metadata.block_format.rtime,
                duration: metadata.block_format.duration,
                gains: self.render(metadata),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::bs2051::get_layout;
    use crate::metadata::ObjectDivergence;
    use crate::position::{CartesianPosition, PolarPosition};
    use approx::assert_abs_diff_eq;

    fn gain_calc(name: &str) -> (Layout, GainCalc) {
        let layout = get_layout(name).unwrap();
        let gc = GainCalc::new(&layout, Some(Screen::default()), &PannerOptions::default()).unwrap();
        (layout, gc)
    }

    fn polar_block(az: f64, el: f64) -> ObjectBlock {
        ObjectBlock {
            position: ObjectPosition::Polar(PolarPosition::unit(az, el)),
            ..Default::default()
        }
    }

    #[test]
    fn test_lfe_is_silent() {
        let (layout, gc) = gain_calc("0+5+0");
        let lfe = layout.channel_index("LFE1").unwrap();

        let block = ObjectBlock {
            width: 360.0,
            height: 360.0,
            ..polar_block(45.0, -30.0)
        };
        let gains = gc.render(&ObjectTypeMetadata::new(block));
        assert_eq!(gains.direct.len(), layout.num_channels());
        assert_eq!(gains.direct[lfe], 0.0);
        assert_eq!(gains.diffuse[lfe], 0.0);
    }

    #[test]
    fn test_gain_scales() {
        let (layout, gc) = gain_calc("0+5+0");
        let block = ObjectBlock {
            gain: 0.5,
            ..polar_block(30.0, 0.0)
        };
        let gains = gc.render(&ObjectTypeMetadata::new(block));
        assert_abs_diff_eq!(gains.direct[layout.channel_index("M+030").unwrap()], 0.5, epsilon = 1e-9);
    }

    #[test]
    fn test_cartesian_matches_polar_at_loudspeakers() {
        let (layout, gc) = gain_calc("0+5+0");
        let block = ObjectBlock {
            position: ObjectPosition::Cartesian(CartesianPosition::new(-1.0, 1.0, 0.0)),
            cartesian: true,
            ..Default::default()
        };
        let gains = gc.render(&ObjectTypeMetadata::new(block));
        assert_abs_diff_eq!(gains.direct[layout.channel_index("M+030").unwrap()], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cartesian_divergence_power() {
        let (_, gc) = gain_calc("4+5+0");
        let block = ObjectBlock {
            position: ObjectPosition::Cartesian(CartesianPosition::new(0.0, 1.0, 0.0)),
            cartesian: true,
            object_divergence: Some(ObjectDivergence {
                value: 0.5,
                azimuth_range: 45.0,
                position_range: 0.5,
            }),
            ..Default::default()
        };
        let gains = gc.render(&ObjectTypeMetadata::new(block));
        let power: f64 = gains.direct.iter().map(|g| g * g).sum();
        assert_abs_diff_eq!(power, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_render_blocks_keeps_order_and_timing() {
        let (_, gc) = gain_calc("0+5+0");
        let blocks: Vec<ObjectTypeMetadata> = (0..8)
            .map(|i| {
                ObjectTypeMetadata::new(ObjectBlock {
                    rtime: Some(i as f64 * 0.1),
                    duration: Some(0.1),
                    ..polar_block(i as f64 * 20.0, 0.0)
                })
            })
            .collect();

        let results = gc.render_blocks(&blocks);
        assert_eq!(results.len(), blocks.len());
        for (block, result) in blocks.iter().zip(results.iter()) {
            assert_eq!(result.rtime, block.block_format.rtime);
            assert_eq!(result.duration, Some(0.1));
            assert_eq!(result.gains, gc.render(block));
        }
    }

    #[test]
    fn test_invalid_options_rejected() {
        let layout = get_layout("4+5+0").unwrap();
        let options = PannerOptions {
            fade_width: -10.0,
            ..Default::default()
        };
        assert!(matches!(
            GainCalc::new(&layout, None, &options),
            Err(crate::error::AdmError::InvalidOption { .. })
        ));
    }

    #[test]
    fn test_no_screen_disables_screen_ref() {
        let layout = get_layout("0+5+0").unwrap();
        let gc = GainCalc::new(&layout, None, &PannerOptions::default()).unwrap();

        let block = ObjectBlock {
            screen_ref: true,
            ..polar_block(20.0, 0.0)
        };
        let with_ref = gc.render(&ObjectTypeMetadata::new(block.clone()));
        let without = gc.render(&ObjectTypeMetadata::new(ObjectBlock {
            screen_ref: false,
            ..block
        }));
        assert_eq!(with_ref, without);
    }
}
