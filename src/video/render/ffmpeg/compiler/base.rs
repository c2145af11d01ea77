use anyhow::{Result, bail};

use super::util::format_time;
use super::{FfmpegCompiler, FilterChain};
use crate::video::render::program::{
    BaseAssemblyProgram, Fade, UnitTransform, ZoomDirection, ZoomPan,
};

impl FfmpegCompiler {
    /// One labelled chain per unit followed by the concat of every label.
    pub(super) fn build_base_graph(&self, program: &BaseAssemblyProgram) -> Result<String> {
        if program.units.is_empty() {
            bail!("base assembly has no units");
        }
        if program.concat.segments != program.units.len() {
            bail!(
                "concat expects {} segments but program has {} units",
                program.concat.segments,
                program.units.len()
            );
        }

        let mut graph = FilterChain::new();
        let mut concat_inputs = String::new();

        for (position, unit) in program.units.iter().enumerate() {
            if unit.input >= program.inputs.len() {
                bail!("unit {} references missing input {}", position, unit.input);
            }
            let label = format!("v{position}");
            graph.push(format!(
                "[{input}:v]{chain}[{label}]",
                input = unit.input,
                chain = self.unit_chain(unit),
            ));
            concat_inputs.push_str(&format!("[{label}]"));
        }

        graph.push(format!(
            "{concat_inputs}concat=n={}:v=1:a=0[outv]",
            program.concat.segments
        ));

        Ok(graph.join())
    }

    fn unit_chain(&self, unit: &UnitTransform) -> String {
        let mut chain = FilterChain::new();
        chain.push(self.zoompan_filter(&unit.zoom));
        chain.push(fade_filter("in", unit.fade_in));
        chain.push(fade_filter("out", unit.fade_out));
        chain.join_linear()
    }

    pub(super) fn zoompan_filter(&self, zoom: &ZoomPan) -> String {
        let expression = match zoom.direction {
            ZoomDirection::In => format!("min(zoom+{},{:.1})", zoom.step, zoom.max_scale),
            ZoomDirection::Out => format!(
                "if(lte(zoom,{min:.1}),{max:.1},max({min:.1},zoom-{step}))",
                min = zoom.min_scale,
                max = zoom.max_scale,
                step = zoom.step
            ),
        };
        format!(
            "zoompan=z='{expression}':d={frames}:s={w}x{h}:fps={fps}",
            frames = zoom.frames,
            w = self.dimensions.width,
            h = self.dimensions.height,
            fps = self.frame_rate,
        )
    }
}

fn fade_filter(kind: &str, fade: Fade) -> String {
    format!(
        "fade=t={kind}:st={}:d={}",
        format_time(fade.start),
        format_time(fade.duration)
    )
}
