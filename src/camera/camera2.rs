use anyhow::{anyhow, Result};
use core::slice;
use log::{debug, error, info, warn};
use ndk_sys::{
    acamera_metadata_tag, camera_status_t, media_status_t, ACameraCaptureSession,
    ACameraCaptureSession_close, ACameraCaptureSession_setRepeatingRequest,
    ACameraCaptureSession_stateCallbacks, ACameraCaptureSession_stopRepeating, ACameraDevice,
    ACameraDevice_StateCallbacks, ACameraDevice_close, ACameraDevice_createCaptureRequest,
    ACameraDevice_createCaptureSession, ACameraDevice_getId, ACameraDevice_request_template,
    ACameraManager_create, ACameraManager_delete, ACameraManager_deleteCameraIdList,
    ACameraManager_getCameraCharacteristics, ACameraManager_getCameraIdList,
    ACameraManager_openCamera, ACameraMetadata, ACameraMetadata_const_entry, ACameraMetadata_free,
    ACameraMetadata_getConstEntry, ACameraOutputTarget, ACameraOutputTarget_create,
    ACameraOutputTarget_free, ACaptureRequest, ACaptureRequest_addTarget, ACaptureRequest_free,
    ACaptureSessionOutput, ACaptureSessionOutputContainer, ACaptureSessionOutputContainer_add,
    ACaptureSessionOutputContainer_create, ACaptureSessionOutputContainer_free,
    ACaptureSessionOutput_create, ACaptureSessionOutput_free, AImage, AImageReader,
    AImageReader_ImageListener, AImageReader_acquireLatestImage, AImageReader_delete,
    AImageReader_getFormat, AImageReader_getHeight, AImageReader_getWidth, AImageReader_getWindow,
    AImageReader_new, AImageReader_setImageListener, AImage_delete, AImage_getPlaneData,
    AImage_getPlanePixelStride, AImage_getPlaneRowStride, ANativeWindow, AIMAGE_FORMATS,
};
use std::{
    ffi::{c_int, c_void, CStr},
    mem::zeroed,
    ptr::null_mut,
    time::Instant,
};

use super::{
    choose_preview_size,
    convert::{compact_rows, decode_yuv420sp, interleave_vu, rotate_frame},
    FrameSink,
};
use crate::android::{check_self_permission, request_camera_permission, CAMERA_PERMISSION};

#[link(name = "camera2ndk")]
extern "C" {}

#[link(name = "mediandk")]
extern "C" {}

/// Camera2 NDK device streaming YUV_420_888 frames through an `AImageReader`.
/// NDK callbacks keep a raw pointer to this struct, so it must not move
/// while a device is open.
pub struct AndroidCamera {
    app: slint::android::AndroidApp,
    camera_device: *mut ACameraDevice,
    capture_request: *mut ACaptureRequest,
    camera_output_target: *mut ACameraOutputTarget,
    session_output: *mut ACaptureSessionOutput,
    capture_session_output_container: *mut ACaptureSessionOutputContainer,
    capture_session: *mut ACameraCaptureSession,
    image_reader: *mut AImageReader,
    /// width,height of the YUV_420_888 output sizes
    preview_sizes: Vec<(u32, u32)>,
    camera_id: Option<String>,
    image_listener: AImageReader_ImageListener,
    capture_session_state_callbacks: ACameraCaptureSession_stateCallbacks,
    device_state_callbacks: ACameraDevice_StateCallbacks,
    timer: Instant,
    frame_count: i32,
    sink: Option<FrameSink>,
    sensor_orientation: i32,
}

/// Deletes an acquired image on every return path.
struct ImageGuard(*mut AImage);

impl Drop for ImageGuard {
    fn drop(&mut self) {
        unsafe { AImage_delete(self.0) };
    }
}

impl AndroidCamera {
    pub fn new(app: slint::android::AndroidApp) -> Self {
        Self {
            app,
            camera_device: null_mut(),
            capture_request: null_mut(),
            camera_output_target: null_mut(),
            session_output: null_mut(),
            capture_session_output_container: null_mut(),
            capture_session: null_mut(),
            image_reader: null_mut(),
            preview_sizes: vec![],
            camera_id: None,
            image_listener: AImageReader_ImageListener {
                context: null_mut(),
                onImageAvailable: None,
            },
            capture_session_state_callbacks: unsafe { zeroed() },
            device_state_callbacks: unsafe { zeroed() },
            timer: Instant::now(),
            frame_count: 0,
            sink: None,
            sensor_orientation: 0,
        }
    }

    pub fn open(&mut self, camera_id: &str) -> Result<()> {
        if !check_self_permission(&self.app, CAMERA_PERMISSION)? {
            request_camera_permission(&self.app)?;
            return Err(anyhow!("camera permission not granted"));
        }
        unsafe {
            let camera_manager = ACameraManager_create();
            let result = self.open_with(camera_manager, camera_id);
            ACameraManager_delete(camera_manager);
            result
        }
    }

    unsafe fn open_with(
        &mut self,
        camera_manager: *mut ndk_sys::ACameraManager,
        camera_id: &str,
    ) -> Result<()> {
        let mut camera_id_list_raw = null_mut();
        let camera_status = ACameraManager_getCameraIdList(camera_manager, &mut camera_id_list_raw);
        if camera_status != camera_status_t::ACAMERA_OK {
            return Err(anyhow!(
                "Failed to get camera id list (reason: {:?})",
                camera_status
            ));
        }
        if camera_id_list_raw.is_null() {
            return Err(anyhow!(
                "Failed to get camera id list (reason: camera_id_list is null)"
            ));
        }

        let camera_id_list = &*camera_id_list_raw;
        if camera_id_list.numCameras < 1 {
            ACameraManager_deleteCameraIdList(camera_id_list_raw);
            return Err(anyhow!("No camera device detected."));
        }

        let camera_ids =
            slice::from_raw_parts(camera_id_list.cameraIds, camera_id_list.numCameras as usize);
        let selected_camera_id = camera_ids
            .iter()
            .find(|cid| get_cstr(**cid) == Some(camera_id))
            .copied();
        info!(
            "camera ids: {:?}",
            camera_ids.iter().map(|cid| get_cstr(*cid)).collect::<Vec<_>>()
        );

        let result = match selected_camera_id {
            None => Err(anyhow!("Camera Id {camera_id} not found.")),
            Some(selected_camera_id) => self.open_device(camera_manager, selected_camera_id, camera_id),
        };
        ACameraManager_deleteCameraIdList(camera_id_list_raw);
        result
    }

    unsafe fn open_device(
        &mut self,
        camera_manager: *mut ndk_sys::ACameraManager,
        selected_camera_id: *const ::std::os::raw::c_char,
        camera_id: &str,
    ) -> Result<()> {
        let mut camera_metadata = null_mut();
        let camera_status = ACameraManager_getCameraCharacteristics(
            camera_manager,
            selected_camera_id,
            &mut camera_metadata,
        );
        if camera_status != camera_status_t::ACAMERA_OK {
            return Err(anyhow!(
                "Failed to get camera meta data of camera {camera_id}"
            ));
        }

        let (lens_facing, sensor_orientation) = AndroidCamera::get_sensor_orientation(camera_metadata);
        info!("lens_facing: {lens_facing}, sensor_orientation: {sensor_orientation}");
        self.sensor_orientation = sensor_orientation;

        let preview_sizes = AndroidCamera::get_video_size(camera_metadata);
        ACameraMetadata_free(camera_metadata);
        self.preview_sizes = preview_sizes?;
        info!("preview sizes: {:?}", self.preview_sizes);

        unsafe extern "C" fn on_disconnected(_data: *mut c_void, device: *mut ACameraDevice) {
            info!("Camera(id: {:?}) is disconnected.", get_cstr(ACameraDevice_getId(device)));
        }

        unsafe extern "C" fn on_error(_data: *mut c_void, device: *mut ACameraDevice, error: c_int) {
            error!("Error(code: {}) on Camera(id: {:?}).", error, get_cstr(ACameraDevice_getId(device)));
        }

        self.device_state_callbacks.onDisconnected = Some(on_disconnected);
        self.device_state_callbacks.onError = Some(on_error);

        let camera_status = ACameraManager_openCamera(
            camera_manager,
            selected_camera_id,
            &mut self.device_state_callbacks,
            &mut self.camera_device,
        );
        if camera_status != camera_status_t::ACAMERA_OK {
            return Err(anyhow!(
                "Failed to open camera device {camera_id} (reason: {:?})",
                camera_status
            ));
        }

        self.camera_id = Some(camera_id.to_string());
        Ok(())
    }

    fn get_sensor_orientation(camera_metadata: *mut ACameraMetadata) -> (u8, i32) {
        unsafe {
            let mut lens_facing: ACameraMetadata_const_entry = zeroed();
            let mut sensor_orientation: ACameraMetadata_const_entry = zeroed();

            ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_LENS_FACING.0,
                &mut lens_facing,
            );
            ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_SENSOR_ORIENTATION.0,
                &mut sensor_orientation,
            );

            let lens_facing = if lens_facing.count > 0 {
                *lens_facing.data.u8_
            } else {
                0
            };
            let sensor_orientation = if sensor_orientation.count > 0 {
                *sensor_orientation.data.i32_
            } else {
                0
            };
            (lens_facing, sensor_orientation)
        }
    }

    // YUV_420_888 output sizes
    fn get_video_size(camera_metadata: *mut ACameraMetadata) -> Result<Vec<(u32, u32)>> {
        unsafe {
            let mut available_configs: ACameraMetadata_const_entry = zeroed();
            let camera_status = ACameraMetadata_getConstEntry(
                camera_metadata,
                acamera_metadata_tag::ACAMERA_SCALER_AVAILABLE_STREAM_CONFIGURATIONS.0,
                &mut available_configs,
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(anyhow!(
                    "Failed to get ACameraMetadata_const_entry res={:?}",
                    camera_status
                ));
            }

            // entries of 4 int32: format, width, height, input
            let data_i32_list: &[i32] = slice::from_raw_parts(
                available_configs.data.i32_,
                available_configs.count as usize,
            );
            Ok(data_i32_list
                .chunks_exact(4)
                .filter(|c| c[3] == 0 && c[0] == AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32)
                .map(|c| (c[1] as u32, c[2] as u32))
                .collect())
        }
    }

    pub fn close(&mut self) {
        unsafe {
            if !self.capture_session.is_null() {
                ACameraCaptureSession_stopRepeating(self.capture_session);
                ACameraCaptureSession_close(self.capture_session);
                self.capture_session = null_mut();
            }

            if !self.capture_request.is_null() {
                ACaptureRequest_free(self.capture_request);
                self.capture_request = null_mut();
            }

            if !self.camera_output_target.is_null() {
                ACameraOutputTarget_free(self.camera_output_target);
                self.camera_output_target = null_mut();
            }

            if !self.camera_device.is_null() {
                let camera_status = ACameraDevice_close(self.camera_device);
                if camera_status != camera_status_t::ACAMERA_OK {
                    error!("Failed to close CameraDevice.");
                }
                self.camera_device = null_mut();
            }

            if !self.session_output.is_null() {
                ACaptureSessionOutput_free(self.session_output);
                self.session_output = null_mut();
            }

            if !self.capture_session_output_container.is_null() {
                ACaptureSessionOutputContainer_free(self.capture_session_output_container);
                self.capture_session_output_container = null_mut();
            }

            if !self.image_reader.is_null() {
                AImageReader_delete(self.image_reader);
                self.image_reader = null_mut();
            }
        }
        self.sink = None;
        info!("Close Camera");
    }

    pub fn start_preview(&mut self, width: u32, height: u32, sink: FrameSink) -> Result<()> {
        if self.camera_device.is_null() {
            return Err(anyhow!("camera is not open"));
        }
        let (width, height) = choose_preview_size(&self.preview_sizes, width, height)
            .ok_or_else(|| anyhow!("camera {:?} has no YUV_420_888 output", self.camera_id))?;
        info!("preview size {width}x{height}");
        self.sink = Some(sink);
        self.create_image_reader(width, height, AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888)?;
        unsafe {
            let camera_status = ACameraDevice_createCaptureRequest(
                self.camera_device,
                ACameraDevice_request_template::TEMPLATE_PREVIEW,
                &mut self.capture_request,
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(anyhow!(
                    "Failed to create preview capture request (id: {:?})",
                    self.camera_id
                ));
            }

            let mut native_window: *mut ANativeWindow = null_mut();
            let res = AImageReader_getWindow(self.image_reader, &mut native_window);
            if res != media_status_t::AMEDIA_OK {
                return Err(anyhow!("AImageReader_getWindow error res={:?}.", res));
            }

            ACameraOutputTarget_create(native_window, &mut self.camera_output_target);
            ACaptureRequest_addTarget(self.capture_request, self.camera_output_target);

            ACaptureSessionOutput_create(native_window, &mut self.session_output);

            let camera_status =
                ACaptureSessionOutputContainer_create(&mut self.capture_session_output_container);
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(anyhow!(
                    "Failed to create capture session output container (reason: {:?})",
                    camera_status
                ));
            }

            unsafe extern "C" fn capture_session_on_ready(
                _context: *mut c_void,
                session: *mut ACameraCaptureSession,
            ) {
                info!("Session is ready. {:?}", session);
            }

            unsafe extern "C" fn capture_session_on_active(
                _context: *mut c_void,
                session: *mut ACameraCaptureSession,
            ) {
                info!("Session is activated. {:?}", session);
            }

            unsafe extern "C" fn capture_session_on_closed(
                _context: *mut c_void,
                session: *mut ACameraCaptureSession,
            ) {
                info!("Session is closed. {:?}", session);
            }

            self.capture_session_state_callbacks.onReady = Some(capture_session_on_ready);
            self.capture_session_state_callbacks.onActive = Some(capture_session_on_active);
            self.capture_session_state_callbacks.onClosed = Some(capture_session_on_closed);
            self.capture_session_state_callbacks.context = (self as *mut Self) as *mut c_void;

            ACaptureSessionOutputContainer_add(
                self.capture_session_output_container,
                self.session_output,
            );

            let camera_status = ACameraDevice_createCaptureSession(
                self.camera_device,
                self.capture_session_output_container,
                &self.capture_session_state_callbacks,
                &mut self.capture_session,
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(anyhow!(
                    "Failed to create capture session (reason: {:?})",
                    camera_status
                ));
            }

            let camera_status = ACameraCaptureSession_setRepeatingRequest(
                self.capture_session,
                null_mut(),
                1,
                &mut self.capture_request,
                null_mut(),
            );
            if camera_status != camera_status_t::ACAMERA_OK {
                return Err(anyhow!(
                    "Failed to set repeating request (reason: {:?})",
                    camera_status
                ));
            }
        }
        Ok(())
    }

    fn on_image_available(&mut self) -> Result<()> {
        let sink = match self.sink.as_ref() {
            Some(sink) => sink,
            None => return Ok(()),
        };
        unsafe {
            let mut image = null_mut();
            let media_status = AImageReader_acquireLatestImage(self.image_reader, &mut image);
            if media_status != media_status_t::AMEDIA_OK {
                if media_status == media_status_t::AMEDIA_IMGREADER_NO_BUFFER_AVAILABLE {
                    return Err(anyhow!("An image reader frame was discarded"));
                }
                return Err(anyhow!(
                    "Failed to acquire latest image from image reader, error: {:?}.",
                    media_status
                ));
            }
            let image = ImageGuard(image);

            let mut format = 0;
            let res = AImageReader_getFormat(self.image_reader, &mut format);
            if res != media_status_t::AMEDIA_OK {
                return Err(anyhow!("AImageReader_getFormat error res={:?}.", res));
            }
            if format != AIMAGE_FORMATS::AIMAGE_FORMAT_YUV_420_888.0 as i32 {
                return Err(anyhow!("format is not AIMAGE_FORMAT_YUV_420_888"));
            }

            let mut width = 0;
            let mut height = 0;
            let res = AImageReader_getWidth(self.image_reader, &mut width);
            if res != media_status_t::AMEDIA_OK {
                return Err(anyhow!("AImageReader_getWidth error res={:?}.", res));
            }
            let res = AImageReader_getHeight(self.image_reader, &mut height);
            if res != media_status_t::AMEDIA_OK {
                return Err(anyhow!("AImageReader_getHeight error res={:?}.", res));
            }
            let (w, h) = (width as usize, height as usize);

            let mut y_stride = 0;
            let mut uv_stride = 0;
            let mut vu_pixel_stride = 0;
            AImage_getPlaneRowStride(image.0, 0, &mut y_stride);
            AImage_getPlaneRowStride(image.0, 1, &mut uv_stride);
            AImage_getPlanePixelStride(image.0, 1, &mut vu_pixel_stride);

            let y_plane = plane_data(image.0, 0)?;
            let u_plane = plane_data(image.0, 1)?;
            let v_plane = plane_data(image.0, 2)?;

            // repack as NV21: Y plane followed by interleaved VU
            let mut nv21 = compact_rows(y_plane, w, y_stride as usize, h);
            let mut vu = if vu_pixel_stride == 2 {
                // semi-planar: the V plane already interleaves V and U
                compact_rows(v_plane, w, uv_stride as usize, h / 2)
            } else {
                interleave_vu(
                    &compact_rows(u_plane, w / 2, uv_stride as usize, h / 2),
                    &compact_rows(v_plane, w / 2, uv_stride as usize, h / 2),
                )
            };
            vu.resize(w * h / 2, 128);
            nv21.extend_from_slice(&vu);
            drop(image);

            let frame = decode_yuv420sp(&nv21, width as u32, height as u32)
                .ok_or_else(|| anyhow!("odd or short YUV frame {width}x{height}"))?;
            sink.push(rotate_frame(frame, self.sensor_orientation))?;

            self.frame_count += 1;
            if self.timer.elapsed().as_millis() > 1000 {
                debug!("preview FPS:{}", self.frame_count);
                self.timer = Instant::now();
                self.frame_count = 0;
            }
            Ok(())
        }
    }

    fn create_image_reader(
        &mut self,
        width: u32,
        height: u32,
        image_format: AIMAGE_FORMATS,
    ) -> Result<()> {
        unsafe {
            let res = AImageReader_new(
                width as i32,
                height as i32,
                image_format.0 as i32,
                2,
                &mut self.image_reader,
            );
            if res != media_status_t::AMEDIA_OK {
                return Err(anyhow!("create Image Reader error."));
            }

            unsafe extern "C" fn on_image_available(context: *mut c_void, _image_reader: *mut AImageReader) {
                let camera = &mut *(context as *mut AndroidCamera);
                if let Err(err) = camera.on_image_available() {
                    warn!("preview frame dropped: {err:#}");
                }
            }

            let camera_ptr: *mut AndroidCamera = self as *mut _;
            self.image_listener.context = camera_ptr as *mut c_void;
            self.image_listener.onImageAvailable = Some(on_image_available);

            let res = AImageReader_setImageListener(self.image_reader, &mut self.image_listener);
            if res != media_status_t::AMEDIA_OK {
                return Err(anyhow!("set Image Listener error."));
            }
        }
        Ok(())
    }
}

impl Drop for AndroidCamera {
    fn drop(&mut self) {
        self.close();
    }
}

unsafe fn plane_data<'a>(image: *mut AImage, plane: i32) -> Result<&'a [u8]> {
    let mut data = null_mut();
    let mut len = 0;
    let res = AImage_getPlaneData(image, plane, &mut data, &mut len);
    if res != media_status_t::AMEDIA_OK || data.is_null() {
        return Err(anyhow!("AImage_getPlaneData({plane}) error res={:?}.", res));
    }
    Ok(slice::from_raw_parts(data, len as usize))
}

unsafe fn get_cstr<'a>(s: *const ::std::os::raw::c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}
