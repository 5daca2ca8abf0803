//! Core logic for slicing a raw PCM stream into overlapping, independently
//! playable Ogg/Opus chunks.
//!
//! The crate exposes a [`Settings`] type describing how a stream should be
//! partitioned and a [`ChunkTranscoder`] that pulls interleaved float samples
//! from a decoder callback, cuts them into fixed-length windows that overlap
//! by a configurable margin, and encodes every window as a self-contained
//! Ogg/Opus file. Each chunk carries `CF_IN`/`CF_OUT` comment tags naming the
//! number of samples it shares with its neighbours, so a player can
//! cross-fade between consecutive chunks without audible seams.
//!
//! Because every chunk restarts the Opus codec from scratch, the per-chunk
//! [`ChunkEncoder`] hides the codec's convergence artifacts: it prepends a
//! lead-in frame and appends a lead-out frame, both extrapolated from the
//! real audio by a [`LinearPredictiveCoder`] so that the synthetic samples
//! contain no frequency content the chunk does not already have. Errors are
//! reported through [`OpusChunkError`], covering parameter validation,
//! libopus failures and sink IO failures.

use std::io::{self, Write};
use std::mem;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;
use ogg::writing::{PacketWriteEndInfo, PacketWriter};
use thiserror::Error;

/// Sample rates accepted by the Opus codec.
pub const SUPPORTED_RATES: [u32; 5] = [8_000, 12_000, 16_000, 24_000, 48_000];

/// Reference rate of the Ogg granule axis. Granule positions in Ogg/Opus
/// streams always count samples at 48 kHz regardless of the input rate.
const OGG_REFERENCE_RATE: u32 = 48_000;

/// Duration of a single Opus frame in milliseconds. The encoder is locked to
/// 20 ms frames, the codec's recommended balance of latency and efficiency.
const FRAME_MILLIS: usize = 20;

/// Number of coefficients used by the linear predictive coder.
const LPC_ORDER: usize = 24;

/// Size in bytes of the buffer holding one encoded Opus packet. Large enough
/// for 20 ms of raw stereo audio at 48 kHz; encoded packets are smaller.
const ENC_BUF_SIZE: usize = 4096;

/// Number of floats in the frame staging buffer: one 20 ms stereo frame at
/// 48 kHz rounded up to the next power of two.
const RAW_BUF_SIZE: usize = 2048;

/// Number of floats in the LPC working buffer: twice the maximum frame size,
/// used both for lead-in synthesis and lead-out staging.
const LPC_BUF_SIZE: usize = 4096;

/// Lowest bitrate accepted by libopus, in bits per second.
const MIN_BITRATE: u32 = 500;

/// Highest bitrate accepted by libopus, in bits per second.
const MAX_BITRATE: u32 = 512_000;

/// Number of samples in one Opus frame at the given rate.
const fn frame_size(rate: u32) -> usize {
    FRAME_MILLIS * rate as usize / 1000
}

/// Errors that can occur while planning or encoding chunks.
#[derive(Debug, Error)]
pub enum OpusChunkError {
    /// Error returned when the sample rate is not one supported by Opus.
    #[error("unsupported sample rate: {0} (expected 8000, 12000, 16000, 24000 or 48000)")]
    InvalidSampleRate(u32),

    /// Error returned when the channel count is not mono or stereo.
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    InvalidChannelCount(usize),

    /// Error returned when the bitrate lies outside the range libopus accepts.
    #[error("bitrate out of range: {0} (expected 500..=512000)")]
    InvalidBitrate(u32),

    /// Error returned when the chunk length is zero, negative or not finite.
    #[error("chunk length must be a positive number of seconds, got {0}")]
    InvalidChunkLength(f32),

    /// Error returned when the chunk overlap is zero, negative or not finite.
    #[error("chunk overlap must be a positive number of seconds, got {0}")]
    InvalidOverlap(f32),

    /// Wrapper around errors reported by the libopus encoder.
    #[error(transparent)]
    Opus(#[from] opus::Error),

    /// Wrapper around IO errors raised by the output sink.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Configuration for a chunk transcoding pipeline.
///
/// A `Settings` value is immutable once built and captures the input stream
/// parameters (rate, channels), the encoder bitrate and the chunk geometry
/// (body length and overlap, both in seconds). All derived sample quantities
/// are rounded at the configured rate.
///
/// # Examples
///
/// ```
/// use opuschunk::Settings;
///
/// # fn main() -> Result<(), opuschunk::OpusChunkError> {
/// let settings = Settings::builder()
///     .rate(48_000)
///     .channels(1)
///     .length(2.0)
///     .overlap(0.01)
///     .build()?;
///
/// assert_eq!(settings.length_samples(), 96_000);
/// assert_eq!(settings.overlap_samples(), 480);
/// assert_eq!(settings.total_samples(), 96_960);
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Settings {
    rate: u32,
    channels: usize,
    bitrate: u32,
    overlap: f32,
    length: f32,
    serial_seed: Option<u32>,
}

impl Settings {
    /// Create a [`SettingsBuilder`] populated with the default values:
    /// 48 kHz, stereo, 256 kbit/s, 5 s chunks with 1 ms overlap.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Sample rate of the input stream in samples per second.
    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Number of interleaved channels in the input stream.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Target bitrate of the encoded chunks in bits per second.
    pub fn bitrate(&self) -> u32 {
        self.bitrate
    }

    /// Overlap between consecutive chunks in seconds.
    pub fn overlap(&self) -> f32 {
        self.overlap
    }

    /// Length of one chunk body in seconds.
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Base value for the Ogg serial numbers of produced chunks, if one was
    /// configured. Unseeded pipelines derive serials from the system clock.
    pub fn serial_seed(&self) -> Option<u32> {
        self.serial_seed
    }

    /// Overlap between consecutive chunks in samples.
    pub fn overlap_samples(&self) -> usize {
        (f64::from(self.overlap) * f64::from(self.rate)).round() as usize
    }

    /// Length of one chunk body in samples.
    pub fn length_samples(&self) -> usize {
        (f64::from(self.length) * f64::from(self.rate)).round() as usize
    }

    /// Maximum total length of a single chunk in samples, including the
    /// overlap on both sides.
    pub fn total_samples(&self) -> usize {
        self.length_samples() + 2 * self.overlap_samples()
    }

    /// Offset in samples at which the chunk with the given index starts,
    /// including its leading overlap.
    pub fn chunk_start(&self, idx: u64) -> u64 {
        let period = (self.length_samples() + self.overlap_samples()) as u64;
        (period * idx).saturating_sub(self.overlap_samples() as u64)
    }

    /// Offset in samples at which the chunk with the given index ends,
    /// including its trailing overlap.
    pub fn chunk_end(&self, idx: u64) -> u64 {
        let period = (self.length_samples() + self.overlap_samples()) as u64;
        period * (idx + 1)
    }
}

impl Default for Settings {
    fn default() -> Self {
        SettingsBuilder::new()
            .build()
            .expect("default settings must be valid")
    }
}

/// Builder for [`Settings`] values.
///
/// All fields are validated by [`build`](SettingsBuilder::build); invalid
/// values are reported as [`OpusChunkError`] variants rather than panics.
pub struct SettingsBuilder {
    rate: u32,
    channels: usize,
    bitrate: u32,
    overlap: f32,
    length: f32,
    serial_seed: Option<u32>,
}

impl SettingsBuilder {
    /// Create a builder holding the default configuration.
    pub fn new() -> Self {
        Self {
            rate: 48_000,
            channels: 2,
            bitrate: 256_000,
            overlap: 1.0e-3,
            length: 5.0,
            serial_seed: None,
        }
    }

    /// Set the sample rate. Must be one of the rates supported by the Opus
    /// codec: 8000, 12000, 16000, 24000 or 48000 samples per second.
    pub fn rate(mut self, rate: u32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the number of interleaved channels. Must be 1 or 2.
    pub fn channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Set the encoder bitrate in bits per second. Per the libopus
    /// documentation this must lie between 500 and 512000; the default of
    /// 256000 yields a perceptually unchanged music stream.
    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = bitrate;
        self
    }

    /// Set the overlap between consecutive chunks in seconds. Must be a
    /// positive number.
    pub fn overlap(mut self, overlap: f32) -> Self {
        self.overlap = overlap;
        self
    }

    /// Set the chunk body length in seconds. Must be a positive number.
    pub fn length(mut self, length: f32) -> Self {
        self.length = length;
        self
    }

    /// Seed the Ogg serial numbers of produced chunks. Chunk `i` receives
    /// `seed + i`, making the output byte-reproducible across runs.
    pub fn serial_seed(mut self, seed: u32) -> Self {
        self.serial_seed = Some(seed);
        self
    }

    /// Finalize the builder, validating every field.
    ///
    /// # Errors
    /// Returns the matching [`OpusChunkError`] variant when the rate is not
    /// supported by Opus, the channel count is not 1 or 2, the bitrate lies
    /// outside 500..=512000, or the length or overlap is not a positive
    /// finite number.
    pub fn build(self) -> Result<Settings, OpusChunkError> {
        if !SUPPORTED_RATES.contains(&self.rate) {
            return Err(OpusChunkError::InvalidSampleRate(self.rate));
        }
        if self.channels == 0 || self.channels > 2 {
            return Err(OpusChunkError::InvalidChannelCount(self.channels));
        }
        if !(MIN_BITRATE..=MAX_BITRATE).contains(&self.bitrate) {
            return Err(OpusChunkError::InvalidBitrate(self.bitrate));
        }
        if !self.length.is_finite() || self.length <= 0.0 {
            return Err(OpusChunkError::InvalidChunkLength(self.length));
        }
        if !self.overlap.is_finite() || self.overlap <= 0.0 {
            return Err(OpusChunkError::InvalidOverlap(self.overlap));
        }

        Ok(Settings {
            rate: self.rate,
            channels: self.channels,
            bitrate: self.bitrate,
            overlap: self.overlap,
            length: self.length,
            serial_seed: self.serial_seed,
        })
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// An order-24 linear predictive coder.
///
/// The coder extracts autoregressive prediction coefficients from a stretch
/// of audio and extrapolates the signal forward without introducing new
/// frequency content. It is used to synthesize the lead-in and lead-out
/// frames that mask codec convergence artifacts at chunk boundaries. The
/// coefficient extraction is the classic Levinson-Durbin recursion over a
/// lag-windowed autocorrelation, after an implementation by Jutta Degener
/// and Carsten Bormann that also appears in libopusenc.
///
/// Degenerate input (silence) short-circuits the recursion and yields a
/// silent extrapolation; extraction and prediction never fail.
#[derive(Clone, Debug, Default)]
pub struct LinearPredictiveCoder {
    coeffs: [f32; LPC_ORDER],
}

impl LinearPredictiveCoder {
    /// Create a coder with all coefficients zeroed.
    pub fn new() -> Self {
        Self::default()
    }

    /// The order of the predictor, i.e. the number of coefficients.
    pub const fn order() -> usize {
        LPC_ORDER
    }

    /// The coefficients produced by the last extraction.
    pub fn coeffs(&self) -> &[f32] {
        &self.coeffs
    }

    /// Extract prediction coefficients from `n_samples` samples of one
    /// channel of interleaved audio.
    ///
    /// `samples` holds at least `n_samples * stride` floats; sample `i` of
    /// the analyzed channel is read from `samples[i * stride + channel]`.
    /// Accumulation runs in f64, the stored coefficients are f32.
    pub fn extract_coefficients(
        &mut self,
        samples: &[f32],
        n_samples: usize,
        channel: usize,
        stride: usize,
    ) {
        let at = |i: usize| f64::from(samples[i * stride + channel]);

        // Autocorrelation, order + 1 lag coefficients.
        let mut aut = [0.0f64; LPC_ORDER + 1];
        for (j, slot) in aut.iter_mut().enumerate() {
            let mut d = 0.0;
            for i in j..n_samples {
                d += at(i) * at(i - j);
            }
            *slot = d;
        }

        // Lag windowing, approximating exp(-0.5*(2*pi*0.002*i)^2) for low
        // enough orders. Works better than bandwidth expansion.
        for (i, lag) in aut.iter_mut().enumerate().skip(1) {
            *lag -= *lag * (0.008 * 0.008) * (i * i) as f64;
        }

        // Levinson-Durbin recursion with a noise floor of about -100 dB.
        let mut lpc = [0.0f64; LPC_ORDER];
        let mut error = aut[0] * (1.0 + 1e-7);
        let epsilon = 1e-6 * aut[0] + 1e-7;
        for i in 0..LPC_ORDER {
            if error < epsilon {
                for coeff in lpc[i..].iter_mut() {
                    *coeff = 0.0;
                }
                break;
            }

            let mut r = -aut[i + 1];
            for j in 0..i {
                r -= lpc[j] * aut[i - j];
            }
            r /= error;
            lpc[i] = r;

            for j in 0..i / 2 {
                let tmp = lpc[j];
                lpc[j] += r * lpc[i - 1 - j];
                lpc[i - 1 - j] += r * tmp;
            }
            if i & 1 == 1 {
                lpc[i / 2] += lpc[i / 2] * r;
            }

            error *= 1.0 - r * r;
        }

        // Slightly dampen the filter.
        let g = 0.999f64;
        let mut damp = g;
        for (coeff, value) in self.coeffs.iter_mut().zip(lpc.iter()) {
            *coeff = (value * damp) as f32;
            damp *= g;
        }
    }

    /// Predict `n_tar` samples of one channel, continuing the `n_src`
    /// samples that precede them.
    ///
    /// The prediction is an IIR extrapolation: once a target sample has been
    /// emitted it immediately participates in the convolution for the
    /// following samples. Sample `i` of the predicted channel is written to
    /// `tar[i * stride + channel]`; source samples before the start of `src`
    /// read as zero.
    pub fn predict(
        &self,
        src: &[f32],
        n_src: usize,
        tar: &mut [f32],
        n_tar: usize,
        channel: usize,
        stride: usize,
    ) {
        for i in 0..n_tar {
            tar[i * stride + channel] = 0.0;
        }

        for i in 0..n_tar {
            let mut sum = 0.0f64;
            for (j, coeff) in self.coeffs.iter().enumerate() {
                let idx = i as isize - j as isize - 1;
                let sample = if idx >= 0 {
                    f64::from(tar[idx as usize * stride + channel])
                } else {
                    let idx = idx + n_src as isize;
                    if idx >= 0 {
                        f64::from(src[idx as usize * stride + channel])
                    } else {
                        0.0
                    }
                };
                sum -= sample * f64::from(*coeff);
            }
            tar[i * stride + channel] = sum as f32;
        }
    }
}

/// Derive an Ogg serial number from the system clock.
fn clock_serial() -> u32 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    (elapsed.as_secs() as u32) ^ elapsed.subsec_nanos()
}

/// Multiplexer packing Opus packets into a single-stream Ogg bitstream.
///
/// Construction immediately emits the two mandatory header pages: the ID
/// header (`OpusHead`) carrying channel count, pre-skip and input rate, and
/// the comment header (`OpusTags`) carrying the vendor string and key/value
/// tags. Audio packets follow via [`write_frame`](OggOpusMuxer::write_frame);
/// page lacing, flushing and checksumming are handled by the `ogg` crate.
///
/// The stream must be closed by writing its final packet with `last` set:
/// that flushes the pending audio page and marks it end-of-stream. Packets
/// written after a dropped muxer's last incomplete page are lost.
pub struct OggOpusMuxer<W: Write> {
    writer: PacketWriter<'static, W>,
    serial: u32,
}

impl<W: Write> OggOpusMuxer<W> {
    /// Start an Ogg/Opus stream on `sink` by writing both header pages.
    ///
    /// `pre_skip_48k` is the number of leading samples, at the 48 kHz
    /// reference rate, that a decoder must discard. `vendor` names the
    /// encoding library and `tags` become `KEY=value` comment entries.
    ///
    /// # Errors
    /// Fails when the sink refuses the header bytes.
    pub fn new(
        sink: W,
        serial: u32,
        pre_skip_48k: u16,
        vendor: &str,
        tags: &[(String, String)],
        channels: usize,
        rate: u32,
    ) -> io::Result<Self> {
        let mut writer = PacketWriter::new(sink);

        let mut head = Vec::with_capacity(19);
        head.extend_from_slice(b"OpusHead");
        head.push(1); // version
        head.push(channels as u8);
        head.extend_from_slice(&pre_skip_48k.to_le_bytes());
        head.extend_from_slice(&rate.to_le_bytes());
        head.extend_from_slice(&0i16.to_le_bytes()); // output gain
        head.push(0); // channel mapping family: mono/stereo
        writer.write_packet(head, serial, PacketWriteEndInfo::EndPage, 0)?;

        let mut comments = Vec::new();
        comments.extend_from_slice(b"OpusTags");
        comments.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
        comments.extend_from_slice(vendor.as_bytes());
        comments.extend_from_slice(&(tags.len() as u32).to_le_bytes());
        for (key, value) in tags {
            let entry = format!("{key}={value}");
            comments.extend_from_slice(&(entry.len() as u32).to_le_bytes());
            comments.extend_from_slice(entry.as_bytes());
        }
        writer.write_packet(comments, serial, PacketWriteEndInfo::EndPage, 0)?;

        Ok(Self { writer, serial })
    }

    /// Append one Opus packet to the stream.
    ///
    /// `granule_48k` is the granule position of the page the packet ends on:
    /// the total sample count after this packet, scaled to 48 kHz. Setting
    /// `last` finishes the stream and flushes the final page with the
    /// end-of-stream flag set.
    pub fn write_frame(&mut self, last: bool, granule_48k: i64, packet: &[u8]) -> io::Result<()> {
        let end_info = if last {
            PacketWriteEndInfo::EndStream
        } else {
            PacketWriteEndInfo::NormalPacket
        };
        self.writer
            .write_packet(packet.to_vec(), self.serial, end_info, granule_48k as u64)
    }

    /// Consume the muxer and return the sink.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Thin RAII holder around the libopus encoder, locked to 20 ms frames.
struct OpusFrameEncoder {
    enc: opus::Encoder,
    frame_size: usize,
    lookahead: usize,
    current_bitrate: u32,
}

impl OpusFrameEncoder {
    fn new(rate: u32, channels: usize) -> Result<Self, OpusChunkError> {
        let layout = match channels {
            1 => opus::Channels::Mono,
            2 => opus::Channels::Stereo,
            other => return Err(OpusChunkError::InvalidChannelCount(other)),
        };
        let mut enc = opus::Encoder::new(rate, layout, opus::Application::Audio)?;
        let lookahead = enc.get_lookahead()? as usize;
        Ok(Self {
            enc,
            frame_size: frame_size(rate),
            lookahead,
            current_bitrate: 0,
        })
    }

    /// Forward the bitrate to libopus, skipping redundant updates.
    fn set_bitrate(&mut self, bitrate: u32) -> Result<(), OpusChunkError> {
        if bitrate != self.current_bitrate {
            self.enc.set_bitrate(opus::Bitrate::Bits(bitrate as i32))?;
            self.current_bitrate = bitrate;
        }
        Ok(())
    }

    /// Encode exactly one frame of interleaved float samples into `out`,
    /// returning the packet length in bytes.
    fn encode_float(&mut self, pcm: &[f32], out: &mut [u8]) -> Result<usize, OpusChunkError> {
        Ok(self.enc.encode_float(pcm, out)?)
    }
}

/// Encoder producing one self-contained Ogg/Opus stream per chunk.
///
/// On top of plain frame-by-frame Opus encoding, the chunk encoder makes the
/// produced stream safe to start playing from scratch: the first frame it
/// writes is a synthetic lead-in that runs the signal backwards in time so
/// the decoder's filter state has converged once the real audio begins, and
/// the stream ends with enough extrapolated samples that the decoder can
/// emit the final real samples past its own lookahead. Both extensions are
/// produced by the [`LinearPredictiveCoder`], so they add no frequency
/// content of their own.
///
/// The granule positions written to the container start at `granule_offset`,
/// allowing a chunk to carry its absolute position within a chain of
/// streams. Call [`finish`](ChunkEncoder::finish) to flush the trailing
/// frames and close the stream; a dropped encoder leaves the sink without an
/// end-of-stream marker.
pub struct ChunkEncoder<W: Write> {
    enc: OpusFrameEncoder,
    muxer: OggOpusMuxer<W>,
    lpc: LinearPredictiveCoder,
    enc_buf: Box<[u8]>,
    buf: Vec<f32>,
    lpc_buf: Vec<f32>,
    buf_ptr: usize,
    lpc_buf_ptr: usize,
    granule: i64,
    granule_mul: i64,
    final_padding: usize,
    channels: usize,
    frame_size: usize,
    first: bool,
}

impl<W: Write> ChunkEncoder<W> {
    /// Open an Ogg/Opus stream on `sink` and write its header pages.
    ///
    /// The header pre-skip is reserved as one whole frame plus the codec
    /// lookahead (scaled to 48 kHz): the frame accounts for the synthetic
    /// lead-in, the lookahead for the codec's intrinsic delay. `tags` are
    /// written into the comment header; `granule_offset` seeds the granule
    /// counter so the stream can report its absolute timeline position.
    ///
    /// # Errors
    /// Returns [`OpusChunkError::InvalidChannelCount`] or
    /// [`OpusChunkError::InvalidSampleRate`] for unsupported layouts,
    /// [`OpusChunkError::Opus`] when libopus refuses the configuration and
    /// [`OpusChunkError::Io`] when the sink rejects the headers.
    pub fn new(
        sink: W,
        tags: &[(String, String)],
        granule_offset: i64,
        channels: usize,
        rate: u32,
        serial: u32,
    ) -> Result<Self, OpusChunkError> {
        if channels == 0 || channels > 2 {
            return Err(OpusChunkError::InvalidChannelCount(channels));
        }
        if !SUPPORTED_RATES.contains(&rate) {
            return Err(OpusChunkError::InvalidSampleRate(rate));
        }

        let enc = OpusFrameEncoder::new(rate, channels)?;
        let fs = enc.frame_size;
        let granule_mul = i64::from(OGG_REFERENCE_RATE / rate);
        let pre_skip_48k = granule_mul as u64 * (fs + enc.lookahead) as u64;

        debug_assert!(ENC_BUF_SIZE >= fs * channels * 2);
        debug_assert!(RAW_BUF_SIZE >= fs * channels);
        debug_assert!(LPC_BUF_SIZE >= fs * channels * 2);

        let final_padding = enc.lookahead;
        let muxer = OggOpusMuxer::new(
            sink,
            serial,
            pre_skip_48k as u16,
            opus::version(),
            tags,
            channels,
            rate,
        )?;

        Ok(Self {
            enc,
            muxer,
            lpc: LinearPredictiveCoder::new(),
            enc_buf: vec![0u8; ENC_BUF_SIZE].into_boxed_slice(),
            buf: vec![0.0; RAW_BUF_SIZE],
            lpc_buf: vec![0.0; LPC_BUF_SIZE],
            buf_ptr: 0,
            lpc_buf_ptr: 0,
            granule: granule_offset,
            granule_mul,
            final_padding,
            channels,
            frame_size: fs,
            first: true,
        })
    }

    /// Number of samples constituting a single Opus frame at this rate.
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Number of samples of algorithmic delay of the Opus codec. This many
    /// samples must be discarded from the start of the decoded stream, and
    /// at least this many appended past the real audio for the decoder to
    /// recover every encoded sample.
    pub fn pre_skip(&self) -> usize {
        self.enc.lookahead
    }

    /// Encode a slice of interleaved float samples at the given bitrate.
    ///
    /// The slice is cut into 20 ms frames; full frames are encoded straight
    /// from `src`, a trailing partial frame is staged until the next call or
    /// [`finish`](ChunkEncoder::finish) completes it.
    ///
    /// # Errors
    /// Propagates libopus and sink failures.
    pub fn encode(&mut self, src: &[f32], bitrate: u32) -> Result<(), OpusChunkError> {
        self.enc.set_bitrate(bitrate)?;

        let ch = self.channels;
        let fs = self.frame_size;
        debug_assert_eq!(src.len() % ch, 0);

        let mut src = src;
        let mut n_src = src.len() / ch;
        while n_src > 0 {
            // Take one frame of input, either directly from the source
            // buffer or by filling the staging buffer.
            let n_read = (fs - self.buf_ptr).min(n_src);
            if n_read == fs {
                let last_in_seq = n_src - fs < fs;
                self.encode_frame(&src[..fs * ch], last_in_seq, false)?;
            } else {
                self.buf[self.buf_ptr * ch..(self.buf_ptr + n_read) * ch]
                    .copy_from_slice(&src[..n_read * ch]);
                self.buf_ptr += n_read;
                if self.buf_ptr == fs {
                    let last_in_seq = n_src - n_read < fs;
                    let staged = mem::take(&mut self.buf);
                    self.encode_frame(&staged[..fs * ch], last_in_seq, false)?;
                    self.buf = staged;
                    self.buf_ptr = 0;
                }
            }

            src = &src[n_read * ch..];
            n_src -= n_read;
        }
        Ok(())
    }

    /// Flush pending samples and close the Ogg stream, returning the sink.
    ///
    /// The residual partial frame is completed by linear prediction. When
    /// the room left in that frame cannot absorb the codec lookahead, one
    /// extra fully synthesized frame is appended so the decoder can recover
    /// every real sample; the end-of-stream flag lands on whichever frame is
    /// written last.
    ///
    /// # Errors
    /// Propagates libopus and sink failures.
    pub fn finish(mut self) -> Result<W, OpusChunkError> {
        let ch = self.channels;
        let needs_extra_frame = (self.frame_size - self.buf_ptr) < self.enc.lookahead;

        let staged = mem::take(&mut self.buf);
        self.encode_frame(
            &staged[..self.buf_ptr * ch],
            needs_extra_frame,
            !needs_extra_frame,
        )?;
        self.buf = staged;
        self.buf_ptr = 0;

        if needs_extra_frame {
            debug!("appending an extra lead-out frame to cover the codec lookahead");
            self.encode_frame(&[], false, true)?;
        }
        Ok(self.muxer.into_inner())
    }

    /// Encode a single frame, synthesizing the lead-in before the first real
    /// frame and extending a short final frame by linear prediction.
    ///
    /// `src` holds at most one frame of interleaved samples; fewer than a
    /// full frame marks the end of the stream. `last_in_seq` caches the
    /// frame so a subsequent tail can extrapolate from it. `flush` closes
    /// the Ogg stream after this frame.
    fn encode_frame(
        &mut self,
        src: &[f32],
        last_in_seq: bool,
        flush: bool,
    ) -> Result<(), OpusChunkError> {
        let ch = self.channels;
        let fs = self.frame_size;
        let lpc_fs = fs / 2;
        let n_src = src.len() / ch;
        debug_assert!(n_src <= fs);

        if self.first {
            self.first = false;

            // Lead-in frame: reverse the opening frame so that predicting
            // the unknown past becomes predicting the future, extrapolate
            // one frame, and reverse the prediction back into place.
            let mut scratch = mem::take(&mut self.lpc_buf);
            scratch[..2 * fs * ch].fill(0.0);
            scratch[..n_src * ch].copy_from_slice(src);
            scratch[..fs * ch].reverse();
            {
                let (head, tail) = scratch.split_at_mut(fs * ch);
                let basis = &head[lpc_fs * ch..];
                for c in 0..ch {
                    self.lpc.extract_coefficients(basis, lpc_fs, c, ch);
                    self.lpc.predict(basis, lpc_fs, tail, fs, c, ch);
                }
            }
            scratch[fs * ch..2 * fs * ch].reverse();

            self.granule += fs as i64;
            let size = self
                .enc
                .encode_float(&scratch[fs * ch..2 * fs * ch], &mut self.enc_buf)?;
            self.muxer
                .write_frame(false, self.granule * self.granule_mul, &self.enc_buf[..size])?;
            self.lpc_buf = scratch;
        }

        self.granule += n_src as i64;

        if n_src < fs {
            // Final frame: append the remaining samples to the staged data,
            // extend them to a whole frame by linear prediction and credit
            // the granule with the padding the decoder still owes.
            let mut staged = mem::take(&mut self.lpc_buf);
            let start = self.lpc_buf_ptr;
            staged[start * ch..(start + n_src) * ch].copy_from_slice(src);
            self.lpc_buf_ptr += n_src;

            let n_lpc_src = lpc_fs.min(self.lpc_buf_ptr);
            let n_lpc_tar = fs - n_src;
            let basis_start = self.lpc_buf_ptr - n_lpc_src;
            {
                let (basis, tar) = staged[basis_start * ch..].split_at_mut(n_lpc_src * ch);
                for c in 0..ch {
                    self.lpc.extract_coefficients(basis, n_lpc_src, c, ch);
                    self.lpc.predict(basis, n_lpc_src, tar, n_lpc_tar, c, ch);
                }
            }

            let add_granule = self.final_padding.min(fs - n_src);
            self.granule += add_granule as i64;
            self.final_padding -= add_granule;

            let frame = &staged[start * ch..(start + fs) * ch];
            let size = self.enc.encode_float(frame, &mut self.enc_buf)?;
            self.muxer
                .write_frame(flush, self.granule * self.granule_mul, &self.enc_buf[..size])?;

            if last_in_seq {
                staged.copy_within(start * ch..(start + fs) * ch, 0);
                self.lpc_buf_ptr = fs;
            }
            self.lpc_buf = staged;
        } else {
            if last_in_seq {
                // Keep the frame around so a subsequent tail can extract
                // its prediction coefficients from it.
                self.lpc_buf[..n_src * ch].copy_from_slice(src);
                self.lpc_buf_ptr = n_src;
            }

            let size = self.enc.encode_float(src, &mut self.enc_buf)?;
            self.muxer
                .write_frame(flush, self.granule * self.granule_mul, &self.enc_buf[..size])?;
        }
        Ok(())
    }
}

/// Planner cutting a PCM stream into overlapping chunks and encoding each
/// one as a standalone Ogg/Opus file.
///
/// The transcoder pulls interleaved float samples from a decoder callback.
/// Chunk `i` covers the half-open sample interval
/// `[max(0, i*(L+O) - O), (i+1)*(L+O))` of the input timeline, where `L` and
/// `O` are the configured body length and overlap in samples, so consecutive
/// chunks share exactly `O` samples. Every produced chunk carries `CF_IN`
/// and `CF_OUT` comment tags naming the overlap a player should cross-fade
/// on each side; the trailing tag is `0` on the final chunk of the stream.
///
/// A short read from the callback is the one and only end-of-stream signal.
/// Once the stream has ended, [`transcode`](ChunkTranscoder::transcode)
/// returns `false` and [`has_next`](ChunkTranscoder::has_next) stays false.
///
/// # Examples
///
/// ```
/// use opuschunk::{ChunkTranscoder, Settings};
///
/// # fn main() -> Result<(), opuschunk::OpusChunkError> {
/// let settings = Settings::builder()
///     .channels(1)
///     .length(0.1)
///     .overlap(0.001)
///     .serial_seed(7)
///     .build()?;
///
/// // 0.15 s of silence: one full chunk plus a shorter final chunk.
/// let mut remaining = 7_200usize;
/// let mut transcoder = ChunkTranscoder::new(
///     move |buf: &mut [f32]| {
///         let n = remaining.min(buf.len());
///         buf[..n].fill(0.0);
///         remaining -= n;
///         n
///     },
///     0,
///     settings,
/// );
///
/// let mut chunks = Vec::new();
/// loop {
///     let mut chunk = Vec::new();
///     if !transcoder.transcode(&mut chunk)? {
///         break;
///     }
///     chunks.push(chunk);
/// }
///
/// assert_eq!(chunks.len(), 2);
/// assert!(chunks.iter().all(|chunk| chunk.starts_with(b"OggS")));
/// # Ok(())
/// # }
/// ```
pub struct ChunkTranscoder<'d> {
    decoder: Box<dyn FnMut(&mut [f32]) -> usize + 'd>,
    offs: u64,
    settings: Settings,
    buf: Vec<f32>,
    buf_ptr: usize,
    at_end: bool,
}

impl<'d> ChunkTranscoder<'d> {
    /// Create a transcoder reading raw audio from a callback.
    ///
    /// The callback fills the given slice with interleaved float samples and
    /// returns how many multi-channel samples it delivered; the slice length
    /// is always `samples * channels` floats. Returning fewer samples than
    /// requested signals the end of the stream. `decoder_offset` is the
    /// position of the first delivered sample on the global timeline.
    pub fn new(
        decoder: impl FnMut(&mut [f32]) -> usize + 'd,
        decoder_offset: u64,
        settings: Settings,
    ) -> Self {
        let capacity = settings.total_samples() * settings.channels();
        Self {
            decoder: Box::new(decoder),
            offs: decoder_offset,
            settings,
            buf: vec![0.0; capacity],
            buf_ptr: 0,
            at_end: false,
        }
    }

    /// Create a transcoder reading raw audio from a byte stream of
    /// little-endian f32 samples.
    ///
    /// This is a thin adapter over the callback constructor; read errors
    /// behave like an end of stream.
    pub fn from_reader(
        mut reader: impl io::Read + 'd,
        decoder_offset: u64,
        settings: Settings,
    ) -> Self {
        let channels = settings.channels();
        let mut scratch: Vec<u8> = Vec::new();
        Self::new(
            move |buf: &mut [f32]| {
                scratch.resize(buf.len() * mem::size_of::<f32>(), 0);
                let mut filled = 0;
                while filled < scratch.len() {
                    match reader.read(&mut scratch[filled..]) {
                        Ok(0) => break,
                        Ok(n) => filled += n,
                        Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(_) => break,
                    }
                }
                let whole = filled / (mem::size_of::<f32>() * channels);
                for (slot, raw) in buf[..whole * channels]
                    .iter_mut()
                    .zip(scratch.chunks_exact(4))
                {
                    *slot = f32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
                }
                whole
            },
            decoder_offset,
            settings,
        )
    }

    /// The settings this transcoder was created with.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Position of the first buffered sample on the input timeline.
    fn read_offs(&self) -> u64 {
        self.offs.saturating_sub(self.buf_ptr as u64)
    }

    /// Index of the next chunk to be produced.
    ///
    /// Derived from the position of the buffer head; when the decoder has
    /// already run past the start of the tentative chunk, that chunk can no
    /// longer be served and the index moves to the next one.
    pub fn idx(&self) -> u64 {
        let period = (self.settings.length_samples() + self.settings.overlap_samples()) as u64;
        let p = self.read_offs();
        let mut idx = (p + self.settings.overlap_samples() as u64) / period;
        if p > self.settings.chunk_start(idx) {
            idx += 1;
        }
        idx
    }

    /// Whether a further call to [`transcode`](ChunkTranscoder::transcode)
    /// can still produce a chunk. Once this returns false, `transcode` is
    /// guaranteed to return false.
    pub fn has_next(&self) -> bool {
        !self.at_end
    }

    /// Read the next chunk from the input, encode it and write the complete
    /// Ogg/Opus stream to `sink`.
    ///
    /// Returns `Ok(true)` when a chunk was written and `Ok(false)` when the
    /// input stream was exhausted before the chunk could start.
    ///
    /// # Errors
    /// Propagates encoder and sink failures. After an error the transcoder
    /// state is indeterminate and the instance should be discarded.
    pub fn transcode<W: Write>(&mut self, sink: W) -> Result<bool, OpusChunkError> {
        if self.at_end {
            return Ok(false);
        }

        let ch = self.settings.channels();
        let idx = self.idx();
        let start = self.settings.chunk_start(idx);

        // Advance the decoder to the chunk start, discarding buffered data.
        while self.offs < start {
            let want = ((start - self.offs) as usize).min(self.buf.len() / ch);
            let read = (self.decoder)(&mut self.buf[..want * ch]);
            self.offs += read as u64;
            if read < want {
                self.at_end = true;
                return Ok(false);
            }
            self.buf_ptr = 0;
        }
        debug_assert_eq!(self.read_offs(), start);

        // Read the remaining chunk data and assemble the crossfade metadata.
        let overlap = self.settings.overlap_samples();
        let crossfade_in = if start == 0 { 0 } else { overlap };
        let mut crossfade_out = overlap;
        let n_read = (self.settings.chunk_end(idx) - self.offs) as usize;
        let begin = self.buf_ptr * ch;
        let read = (self.decoder)(&mut self.buf[begin..begin + n_read * ch]);
        debug_assert!(read <= n_read);
        if read < n_read {
            crossfade_out = 0;
            self.at_end = true;
        }
        self.offs += read as u64;

        let total = self.buf_ptr + read;
        if total == 0 {
            return Ok(false);
        }

        debug!(
            "transcoding chunk {idx}: {total} samples, cf_in={crossfade_in}, cf_out={crossfade_out}"
        );

        let serial = match self.settings.serial_seed() {
            Some(seed) => seed.wrapping_add(idx as u32),
            None => clock_serial(),
        };
        let tags = [
            ("CF_IN".to_string(), crossfade_in.to_string()),
            ("CF_OUT".to_string(), crossfade_out.to_string()),
        ];
        let mut encoder = ChunkEncoder::new(sink, &tags, 0, ch, self.settings.rate(), serial)?;
        encoder.encode(&self.buf[..total * ch], self.settings.bitrate())?;
        encoder.finish()?;

        // Keep the trailing overlap; it opens the next chunk.
        self.buf
            .copy_within((total - crossfade_out) * ch..total * ch, 0);
        self.buf_ptr = crossfade_out;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::TAU;

    #[test]
    fn settings_builder_applies_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.rate(), 48_000);
        assert_eq!(settings.channels(), 2);
        assert_eq!(settings.bitrate(), 256_000);
        assert_eq!(settings.overlap_samples(), 48);
        assert_eq!(settings.length_samples(), 240_000);
        assert_eq!(settings.total_samples(), 240_096);
        assert_eq!(settings.length(), 5.0);
        assert_eq!(settings.overlap(), 1.0e-3);
        assert!(settings.serial_seed().is_none());
    }

    #[test]
    fn settings_builder_rejects_unsupported_rate() {
        // 80000 looks deceptively close to the lowest supported rate and
        // must be rejected along with everything else outside the Opus set.
        for rate in [0, 80_000, 44_100, 96_000] {
            let err = Settings::builder()
                .rate(rate)
                .build()
                .expect_err("unsupported rate should be rejected");
            match err {
                OpusChunkError::InvalidSampleRate(value) => assert_eq!(value, rate),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn settings_builder_accepts_every_opus_rate() {
        for rate in SUPPORTED_RATES {
            let settings = Settings::builder()
                .rate(rate)
                .build()
                .expect("supported rate should be accepted");
            assert_eq!(settings.rate(), rate);
            assert_eq!(OGG_REFERENCE_RATE % rate, 0);
        }
    }

    #[test]
    fn settings_builder_rejects_bad_channel_counts() {
        for channels in [0, 3, 6] {
            let err = Settings::builder()
                .channels(channels)
                .build()
                .expect_err("channel count should be rejected");
            match err {
                OpusChunkError::InvalidChannelCount(value) => assert_eq!(value, channels),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn settings_builder_rejects_out_of_range_bitrate() {
        for bitrate in [0, 499, 512_001] {
            let err = Settings::builder()
                .bitrate(bitrate)
                .build()
                .expect_err("bitrate should be rejected");
            match err {
                OpusChunkError::InvalidBitrate(value) => assert_eq!(value, bitrate),
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn settings_builder_rejects_non_positive_durations() {
        let err = Settings::builder()
            .length(0.0)
            .build()
            .expect_err("zero length should be rejected");
        assert!(matches!(err, OpusChunkError::InvalidChunkLength(_)));

        let err = Settings::builder()
            .length(f32::NAN)
            .build()
            .expect_err("NaN length should be rejected");
        assert!(matches!(err, OpusChunkError::InvalidChunkLength(_)));

        let err = Settings::builder()
            .overlap(-0.5)
            .build()
            .expect_err("negative overlap should be rejected");
        assert!(matches!(err, OpusChunkError::InvalidOverlap(_)));
    }

    #[test]
    fn chunk_boundaries_overlap_by_the_configured_margin() {
        let settings = Settings::builder()
            .length(1.0)
            .overlap(0.25)
            .build()
            .expect("settings should build");

        // L = 48000, O = 12000, period = 60000.
        assert_eq!(settings.chunk_start(0), 0);
        assert_eq!(settings.chunk_end(0), 60_000);
        assert_eq!(settings.chunk_start(1), 48_000);
        assert_eq!(settings.chunk_end(1), 120_000);
        assert_eq!(settings.chunk_start(2), 108_000);

        for idx in 1..6 {
            // Consecutive chunks share exactly the overlap.
            assert_eq!(
                settings.chunk_end(idx - 1) - settings.chunk_start(idx),
                settings.overlap_samples() as u64
            );
            assert_eq!(
                settings.chunk_end(idx) - settings.chunk_end(idx - 1),
                (settings.length_samples() + settings.overlap_samples()) as u64
            );
        }
    }

    #[test]
    fn idx_skips_chunks_the_decoder_has_already_passed() {
        let settings = Settings::builder()
            .channels(1)
            .length(1.0)
            .overlap(0.25)
            .build()
            .expect("settings should build");

        let silent = |buf: &mut [f32]| {
            buf.fill(0.0);
            buf.len()
        };

        // At the stream start the next chunk is chunk 0.
        let transcoder = ChunkTranscoder::new(silent, 0, settings);
        assert_eq!(transcoder.idx(), 0);

        // Exactly at the start of chunk 1 (48000) that chunk is next.
        let transcoder = ChunkTranscoder::new(silent, 48_000, settings);
        assert_eq!(transcoder.idx(), 1);

        // Past the start of chunk 1, only chunk 2 can still be served.
        let transcoder = ChunkTranscoder::new(silent, 70_000, settings);
        assert_eq!(transcoder.idx(), 2);
    }

    #[test]
    fn lpc_extends_silence_with_silence() {
        assert_eq!(LinearPredictiveCoder::order(), 24);

        let mut lpc = LinearPredictiveCoder::new();
        let silence = vec![0.0f32; 512];
        lpc.extract_coefficients(&silence, 512, 0, 1);
        assert!(lpc.coeffs().iter().all(|c| *c == 0.0));

        let mut prediction = vec![1.0f32; 128];
        lpc.predict(&silence, 512, &mut prediction, 128, 0, 1);
        assert!(prediction.iter().all(|p| *p == 0.0));
    }

    #[test]
    fn lpc_continues_a_sine_wave() {
        let amplitude = 0.5f32;
        let source: Vec<f32> = (0..1024)
            .map(|n| amplitude * (TAU * 440.0 * n as f32 / 48_000.0).sin())
            .collect();

        let mut lpc = LinearPredictiveCoder::new();
        lpc.extract_coefficients(&source, 1024, 0, 1);
        assert!(lpc.coeffs().iter().all(|c| c.is_finite()));

        let mut prediction = vec![0.0f32; 960];
        lpc.predict(&source, 1024, &mut prediction, 960, 0, 1);

        // The continuation must track the true signal closely over the
        // opening stretch and stay bounded over the full frame. The 0.999
        // damping deliberately decays the extrapolation, so the tight bound
        // only covers the opening samples.
        for (i, predicted) in prediction.iter().take(50).enumerate() {
            let expected = amplitude * (TAU * 440.0 * (1024 + i) as f32 / 48_000.0).sin();
            assert!(
                (predicted - expected).abs() < 0.05,
                "sample {i}: predicted {predicted}, expected {expected}"
            );
        }
        let source_energy: f32 = source.iter().map(|s| s * s).sum::<f32>() / 1024.0;
        let predicted_energy: f32 = prediction.iter().map(|s| s * s).sum::<f32>() / 960.0;
        assert!(predicted_energy <= source_energy * 1.5);
    }

    #[test]
    fn lpc_respects_stride_and_channel_offsets() {
        // Interleave a sine on the left channel with silence on the right.
        let mut interleaved = vec![0.0f32; 512 * 2];
        for n in 0..512 {
            interleaved[n * 2] = (TAU * 880.0 * n as f32 / 48_000.0).sin();
        }

        let mut lpc = LinearPredictiveCoder::new();
        let mut prediction = vec![0.0f32; 48 * 2];

        lpc.extract_coefficients(&interleaved, 512, 1, 2);
        lpc.predict(&interleaved, 512, &mut prediction, 48, 1, 2);
        assert!(prediction.iter().skip(1).step_by(2).all(|p| *p == 0.0));

        lpc.extract_coefficients(&interleaved, 512, 0, 2);
        lpc.predict(&interleaved, 512, &mut prediction, 48, 0, 2);
        let continues = prediction
            .iter()
            .step_by(2)
            .enumerate()
            .all(|(i, p)| (p - (TAU * 880.0 * (512 + i) as f32 / 48_000.0).sin()).abs() < 0.1);
        assert!(continues, "left channel prediction should follow the sine");
    }

    #[test]
    fn muxer_writes_id_and_comment_headers() {
        let mut sink = Vec::new();
        let tags = [
            ("CF_IN".to_string(), "0".to_string()),
            ("CF_OUT".to_string(), "48".to_string()),
        ];
        let mut muxer = OggOpusMuxer::new(
            &mut sink,
            0xDEAD_BEEF,
            1272,
            "test-vendor",
            &tags,
            2,
            48_000,
        )
        .expect("muxer should start");
        muxer
            .write_frame(true, 960, &[0xFC, 0xFF, 0xFE])
            .expect("frame should be written");
        drop(muxer);

        // First page: 27-byte header, one lacing byte, then the 19-byte ID
        // header payload.
        assert_eq!(&sink[..4], b"OggS");
        assert_eq!(sink[5], 0x02, "first page must carry the BOS flag");
        assert_eq!(
            u32::from_le_bytes([sink[14], sink[15], sink[16], sink[17]]),
            0xDEAD_BEEF
        );
        assert_eq!(sink[26], 1, "ID header should fit a single segment");
        let head = &sink[28..47];
        assert_eq!(&head[..8], b"OpusHead");
        assert_eq!(head[8], 1, "version");
        assert_eq!(head[9], 2, "channel count");
        assert_eq!(u16::from_le_bytes([head[10], head[11]]), 1272, "pre-skip");
        assert_eq!(
            u32::from_le_bytes([head[12], head[13], head[14], head[15]]),
            48_000
        );
        assert_eq!(head[18], 0, "channel mapping family");

        // Second page: the comment header.
        let comments = &sink[47..];
        assert_eq!(&comments[..4], b"OggS");
        let payload = &comments[28..];
        assert_eq!(&payload[..8], b"OpusTags");
        let vendor_len = u32::from_le_bytes([payload[8], payload[9], payload[10], payload[11]]);
        assert_eq!(vendor_len, "test-vendor".len() as u32);
        let tag_text = String::from_utf8_lossy(payload);
        assert!(tag_text.contains("CF_IN=0"));
        assert!(tag_text.contains("CF_OUT=48"));
    }

    #[test]
    fn muxer_marks_the_final_page_with_eos() {
        let mut sink = Vec::new();
        let mut muxer = OggOpusMuxer::new(&mut sink, 7, 312, "vendor", &[], 1, 48_000)
            .expect("muxer should start");
        muxer
            .write_frame(false, 960, &[0x08, 0x00])
            .expect("first frame");
        muxer
            .write_frame(true, 1920, &[0x08, 0x00])
            .expect("last frame");
        drop(muxer);

        // Exactly one page in the stream carries the EOS flag and it is the
        // last one.
        let mut eos_pages = 0;
        let mut last_flag = 0;
        for pos in 0..sink.len() - 4 {
            if &sink[pos..pos + 4] == b"OggS" {
                last_flag = sink[pos + 5];
                if last_flag & 0x04 != 0 {
                    eos_pages += 1;
                }
            }
        }
        assert_eq!(eos_pages, 1);
        assert_eq!(last_flag & 0x04, 0x04);
    }

    #[test]
    fn chunk_encoder_rejects_more_than_two_channels() {
        let err = ChunkEncoder::new(Vec::<u8>::new(), &[], 0, 3, 48_000, 1)
            .err()
            .expect("three channels should be rejected");
        assert!(matches!(err, OpusChunkError::InvalidChannelCount(3)));
    }

    #[test]
    fn chunk_encoder_rejects_unsupported_rates() {
        let err = ChunkEncoder::new(Vec::<u8>::new(), &[], 0, 2, 44_100, 1)
            .err()
            .expect("44.1 kHz should be rejected");
        assert!(matches!(err, OpusChunkError::InvalidSampleRate(44_100)));
    }

    #[test]
    fn transcode_returns_false_for_an_empty_stream() {
        let settings = Settings::builder()
            .channels(1)
            .build()
            .expect("settings should build");
        let mut transcoder = ChunkTranscoder::new(|_buf: &mut [f32]| 0, 0, settings);

        assert!(transcoder.has_next());
        let mut sink = Vec::new();
        let produced = transcoder
            .transcode(&mut sink)
            .expect("transcode should not fail");
        assert!(!produced);
        assert!(!transcoder.has_next());
        assert!(sink.is_empty(), "no bytes may be written for an empty stream");
    }
}
