use super::util::{escape_drawtext_text, escape_ffmpeg_path, format_time};
use super::{CaptionStyle, FfmpegCompiler, FilterChain};
use crate::video::render::program::CaptionOverlay;

impl FfmpegCompiler {
    /// Linear `-vf` chain with one drawtext per caption word.
    pub(super) fn build_caption_chain(&self, captions: &[CaptionOverlay]) -> Option<String> {
        if captions.is_empty() {
            return None;
        }

        let mut chain = FilterChain::new();
        for caption in captions {
            chain.push(self.drawtext_filter(caption));
        }
        Some(chain.join_linear())
    }

    pub(super) fn drawtext_filter(&self, caption: &CaptionOverlay) -> String {
        let style = &self.caption_style;
        let start = format_time(caption.start);
        let end = format_time(caption.end);
        let fade = format_time(caption.fade);

        format!(
            "drawtext=text='{text}':{font}:fontsize={size}:fontcolor={color}:borderw={border}:bordercolor={border_color}:shadowcolor={shadow}:shadowx={shadow_offset}:shadowy={shadow_offset}:x=(w-text_w)/2:y=h-{baseline}+{bounce}*sin(2*PI*t):enable='between(t,{start},{end})':alpha='if(lt(t,{start}+{fade}),(t-{start})/{fade},if(gt(t,{end}-{fade}),({end}-t)/{fade},1))'",
            text = escape_drawtext_text(&caption.text),
            font = font_option(style),
            size = style.font_size,
            color = style.color,
            border = style.border_width,
            border_color = style.border_color,
            shadow = style.shadow_color,
            shadow_offset = style.shadow_offset,
            baseline = style.baseline_offset,
            bounce = style.bounce_amplitude,
        )
    }
}

fn font_option(style: &CaptionStyle) -> String {
    match &style.font_file {
        Some(path) => format!("fontfile={}", escape_ffmpeg_path(path)),
        None => format!("font='{}'", style.font_family),
    }
}
