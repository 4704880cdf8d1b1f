use std::num::NonZeroU32;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use raw_window_handle::HasRawWindowHandle;
use winit::dpi::LogicalSize;
use winit::event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget};
use winit::event::{Event, StartCause, WindowEvent};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowBuilder};

use glutin_winit::DisplayBuilder;
use glutin::config::ConfigTemplateBuilder;
use glutin::context::{Version, ContextApi, ContextAttributesBuilder};
use glutin::context::{NotCurrentGlContext, PossiblyCurrentContext};
use glutin::surface::{GlSurface, Surface, SurfaceAttributesBuilder, WindowSurface};
use glutin::display::{GetGlDisplay, GlDisplay};

use glow::{Context as GlowContext, HasContext};

use gds820::{Image, Palette, RawFrame, IMAGE_WIDTH, IMAGE_HEIGHT};

const DEFAULT_DEVICE_PATH: &str = "/dev/ttyUSB0";

/// Time between screen dump requests.
const UPDATE_PERIOD: Duration = Duration::from_millis(250);

/// Theme selection shared between the input path and the capture thread.
static PALETTE: Palette = Palette::new();

struct ScreenSampler {
    // Sampler does not allocate the image buffers. It relies on a pair of channels acting like
    // a bucket brigade: any received `Image` objects are filled in with decoded captures and
    // sent for display. Eventually the `Image` object comes back from the renderer, and the
    // closed cycle continues.
    device: gds820::Device,
    paused: Arc<AtomicBool>,
    image_recv: Receiver<Image>,
    image_send: Sender<Image>,
}

impl ScreenSampler {
    pub fn new(
        device: gds820::Device,
        paused: Arc<AtomicBool>,
        image_recv: Receiver<Image>,
        image_send: Sender<Image>
    ) -> ScreenSampler {
        ScreenSampler { device, paused, image_recv, image_send }
    }

    pub fn run(mut self) -> thread::JoinHandle<gds820::Result<()>> {
        thread::spawn(move || self.acquire_and_decode())
    }

    fn acquire_and_decode(&mut self) -> gds820::Result<()> {
        let mut frame = RawFrame::new();
        // prime the queue
        let mut active = self.image_recv.recv().expect("failed to receive image");
        let mut standby = None;
        loop {
            let tick_started = Instant::now();
            // pick up returned buffers; the renderer going away ends the thread
            match self.image_recv.try_recv() {
                Ok(image) => standby = Some(image),
                Err(TryRecvError::Empty) => (),
                Err(TryRecvError::Disconnected) => {
                    log::debug!("sampler: done");
                    break
                }
            }
            if !self.paused.load(Ordering::Relaxed) {
                match self.device.acquire_into(&mut frame) {
                    Ok(()) => {
                        gds820::unpack(&frame, PALETTE.current(), &mut active);
                        if let Some(next) = standby.take() {
                            self.image_send.send(active).expect("failed to send image");
                            log::debug!("sampler: submitted image");
                            active = next;
                        } else {
                            log::debug!("sampler: discarded image");
                        }
                    }
                    Err(error @ gds820::Error::Timeout { .. }) =>
                        log::warn!("sampler: {}", error),
                    Err(error @ gds820::Error::Overflow { .. }) => {
                        log::warn!("sampler: {}", error);
                        // drop the stale bytes so the next request starts clean
                        self.device.purge()?;
                    }
                    Err(error) => return Err(error),
                }
            }
            // a failed cycle produces no image; the next tick is a fresh attempt
            if let Some(remaining) = UPDATE_PERIOD.checked_sub(tick_started.elapsed()) {
                thread::sleep(remaining);
            }
        }
        Ok(())
    }
}

struct ScreenRenderer {
    program: <glow::Context as HasContext>::Program,
    vertex_array: <glow::Context as HasContext>::VertexArray,
    texture: <glow::Context as HasContext>::Texture,
    image_recv: Receiver<Image>,
    image_send: Sender<Image>,
    current: Option<Image>,
}

impl ScreenRenderer {
    pub fn new(
        gl: &glow::Context,
        image_recv: Receiver<Image>,
        image_send: Sender<Image>
    ) -> Self {
        let shaders = [
            (glow::VERTEX_SHADER,   include_str!("blit_vert.glsl")),
            (glow::FRAGMENT_SHADER, include_str!("blit_frag.glsl")),
        ];

        unsafe {
            let program = gl.create_program().expect("failed to create program");
            let mut native_shaders = Vec::new();
            for (kind, source) in shaders {
                let shader = gl.create_shader(kind).expect("failed to create shader");
                gl.shader_source(shader, source);
                gl.compile_shader(shader);
                if !gl.get_shader_compile_status(shader) {
                    panic!("could not compile shader: {}", gl.get_shader_info_log(shader));
                }
                gl.attach_shader(program, shader);
                native_shaders.push(shader);
            }
            gl.link_program(program);
            if !gl.get_program_link_status(program) {
                panic!("{}", gl.get_program_info_log(program));
            }
            for shader in native_shaders {
                gl.detach_shader(program, shader);
                gl.delete_shader(shader);
            }

            // the blit quad is generated in the vertex shader; the array object
            // only exists because ES 3.0 requires one to be bound
            let vertex_array = gl.create_vertex_array().expect("failed to create vertex array");

            // scale with NEAREST, like the instrument's blocky LCD
            let texture = gl.create_texture().expect("failed to create texture");
            gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            gl.tex_parameter_i32(glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER, glow::NEAREST as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_S, glow::CLAMP_TO_EDGE as i32);
            gl.tex_parameter_i32(glow::TEXTURE_2D,
                glow::TEXTURE_WRAP_T, glow::CLAMP_TO_EDGE as i32);
            gl.tex_image_2d(glow::TEXTURE_2D, 0, glow::RGB8 as i32,
                IMAGE_WIDTH as i32, IMAGE_HEIGHT as i32, 0,
                glow::RGB, glow::UNSIGNED_BYTE, None);
            gl.bind_texture(glow::TEXTURE_2D, None);

            Self {
                program,
                vertex_array,
                texture,
                image_recv,
                image_send,
                current: None
            }
        }
    }

    pub fn poll(&mut self, gl: &glow::Context) -> bool {
        match self.image_recv.try_recv() {
            err @ Err(TryRecvError::Disconnected) =>
                panic!("renderer: failed to receive image: {:?}", err),
            Err(TryRecvError::Empty) => false,
            Ok(new_image) => {
                log::debug!("renderer: acquired image");
                unsafe {
                    gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
                    gl.tex_sub_image_2d(glow::TEXTURE_2D, 0, 0, 0,
                        IMAGE_WIDTH as i32, IMAGE_HEIGHT as i32,
                        glow::RGB, glow::UNSIGNED_BYTE,
                        glow::PixelUnpackData::Slice(new_image.as_bytes()));
                    gl.bind_texture(glow::TEXTURE_2D, None);
                }
                if let Some(old_image) = self.current.replace(new_image) {
                    self.image_send.send(old_image).expect("failed to return image");
                }
                true
            }
        }
    }

    pub fn resize(&mut self, gl: &glow::Context, width: u32, height: u32) {
        unsafe {
            gl.viewport(0, 0, width as i32, height as i32);
        }
    }

    pub fn render(&mut self, gl: &glow::Context) {
        unsafe {
            gl.clear_color(0.0, 0.0, 0.0, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT);
            if self.current.is_none() { return } // nothing captured yet
            gl.use_program(Some(self.program));
            gl.bind_vertex_array(Some(self.vertex_array));
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(self.texture));
            gl.uniform_1_i32(gl.get_uniform_location(self.program, "screen").as_ref(), 0);
            gl.draw_arrays(glow::TRIANGLE_STRIP, 0, 4);
            gl.bind_texture(glow::TEXTURE_2D, None);
            gl.bind_vertex_array(None);
        }
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            gl.delete_program(self.program);
            gl.delete_vertex_array(self.vertex_array);
            gl.delete_texture(self.texture);
        }
    }
}

struct Application {
    gl_context: PossiblyCurrentContext,
    gl_surface: Surface<WindowSurface>,
    gl_library: GlowContext,
    renderer: ScreenRenderer,
    paused: Arc<AtomicBool>,
    window: Window,
}

impl Application {
    fn update_title(&self) {
        let paused = if self.paused.load(Ordering::Relaxed) { " (paused)" } else { "" };
        self.window.set_title(
            &format!("GDS-820C [{}]{}", PALETTE.current().name, paused));
    }

    fn process_key(&mut self, key: Key<&str>, window_target: &EventLoopWindowTarget<()>) {
        match key {
            Key::Named(NamedKey::Space) => {
                let theme = PALETTE.advance();
                log::info!("switched to theme {:?}", theme.name);
                self.update_title();
            }
            Key::Character("p") => {
                self.paused.fetch_xor(true, Ordering::Relaxed);
                self.update_title();
            }
            Key::Named(NamedKey::Escape) => window_target.exit(),
            _ => ()
        }
    }

    fn process_event(&mut self, event: Event<()>, window_target: &EventLoopWindowTarget<()>) {
        match event {
            Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
                if self.renderer.poll(&self.gl_library) {
                    self.window.request_redraw();
                }
                // The `winit` documentation recommends `Poll`, but there is at most one
                // new image every UPDATE_PERIOD; polling the channel every 5 ms adds no
                // perceptible latency and keeps the core idle.
                window_target.set_control_flow(
                    ControlFlow::wait_duration(Duration::from_millis(5)));
            }
            Event::WindowEvent { event: WindowEvent::RedrawRequested, .. } => {
                self.window.pre_present_notify();
                self.renderer.render(&self.gl_library);
                self.gl_surface.swap_buffers(&self.gl_context)
                    .expect("failed to swap buffers");
            }
            Event::WindowEvent { event: WindowEvent::Resized(size), .. }
                    if size.width != 0 && size.height != 0 => {
                self.renderer.resize(&self.gl_library, size.width, size.height);
                self.gl_surface.resize(&self.gl_context,
                    NonZeroU32::new(size.width).unwrap(),
                    NonZeroU32::new(size.height).unwrap(),
                );
            }
            Event::WindowEvent { event: WindowEvent::KeyboardInput { event, .. }, .. }
                    if event.state.is_pressed() && !event.repeat => {
                self.process_key(event.logical_key.as_ref(), window_target);
            }
            Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => {
                window_target.exit();
            }
            Event::LoopExiting => {
                self.renderer.destroy(&self.gl_library);
            }
            _ => ()
        }
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .format_timestamp_micros()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();
    let device_path = std::env::args().nth(1)
        .unwrap_or_else(|| DEFAULT_DEVICE_PATH.to_owned());
    // create a window
    let event_loop = EventLoop::new().expect("failed to create event loop");
    event_loop.set_control_flow(ControlFlow::wait_duration(Duration::ZERO));
    let window_builder = WindowBuilder::new()
        .with_title(format!("GDS-820C [{}]", PALETTE.current().name))
        .with_inner_size(LogicalSize::new(
            IMAGE_WIDTH as f64 * 2.0, IMAGE_HEIGHT as f64 * 2.0));
    let config_template_builder = ConfigTemplateBuilder::new()
        .prefer_hardware_accelerated(Some(true));
    let (window, gl_config) = DisplayBuilder::new()
        .with_window_builder(Some(window_builder))
        .build(&event_loop, config_template_builder, |mut configs|
            configs.next().expect("no GL configurations available"))
        .expect("failed to create window");
    let window = window.unwrap();
    let (width, height) = window.inner_size().into();
    // create an OpenGL context
    let context_attributes = ContextAttributesBuilder::new()
        .with_context_api(ContextApi::Gles(Some(Version::new(3, 0))))
        .build(Some(window.raw_window_handle()));
    let gl_context = unsafe {
        gl_config.display().create_context(&gl_config, &context_attributes)
            .expect("failed to create GL context")
    };
    let surface_attributes = SurfaceAttributesBuilder::<WindowSurface>::new()
        .build(window.raw_window_handle(),
            NonZeroU32::new(width).unwrap(),
            NonZeroU32::new(height).unwrap(),
        );
    let gl_surface = unsafe {
        gl_config.display().create_window_surface(&gl_config, &surface_attributes)
            .expect("failed to create GL surface")
    };
    let gl_context = gl_context.make_current(&gl_surface)
        .expect("failed to make GL context current");
    let gl_library = unsafe {
        GlowContext::from_loader_function_cstr(|func|
            gl_config.display().get_proc_address(func).cast())
    };
    // create communication channels and prime the bucket brigade
    let (sampler_to_renderer_send, sampler_to_renderer_recv) = channel();
    let (renderer_to_sampler_send, renderer_to_sampler_recv) = channel();
    for _ in 0..3 {
        renderer_to_sampler_send.send(Image::new()).unwrap();
    }
    // set up the acquisition and decode pipeline
    let device = gds820::Device::open(&device_path)
        .expect("failed to open serial device");
    let paused = Arc::new(AtomicBool::new(false));
    let sampler = ScreenSampler::new(device, paused.clone(),
        renderer_to_sampler_recv, sampler_to_renderer_send);
    let renderer = ScreenRenderer::new(&gl_library,
        sampler_to_renderer_recv, renderer_to_sampler_send);
    // run the application
    let sampler_thread = sampler.run();
    {
        let mut application = Application {
            gl_context,
            gl_surface,
            gl_library,
            renderer,
            paused,
            window
        };
        application.renderer.resize(&application.gl_library, width, height);
        event_loop.run(|event, window_target|
            application.process_event(event, window_target))
    }.expect("failed to run application");
    // clean up
    sampler_thread.join()
        .expect("acquisition thread panicked")
        .expect("acquisition failed");
}
